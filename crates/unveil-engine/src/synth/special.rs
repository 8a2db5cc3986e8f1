//! Implicit special members.
//!
//! The front end reports, per class, the state of each special member. For
//! implicitly defaulted ones the engine re-derives deletion from the class's
//! bases and members, refusing to print a body the language would delete.
//! Bodies spell out the member-wise work in the order the language performs
//! it: bases then members in declaration order for construction and
//! assignment, the reverse for destruction.

use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::{Result, SynthesisError};
use unveil_tree::{
    last_component, CppType, Decl, ExprKind, FieldDecl, FunctionKind, MemberState, RecordDecl, RecordTag,
    SpecialKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveMember {
    pub state: MemberState,
    pub noexcept: bool,
    pub is_virtual: bool,
}

/// Special members after deletion and noexcept propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveMembers {
    members: [EffectiveMember; 6],
}

impl EffectiveMembers {
    pub fn get(&self, kind: SpecialKind) -> EffectiveMember {
        self.members[index(kind)]
    }

    fn usable(&self, kind: SpecialKind) -> bool {
        let state = self.get(kind).state;
        match kind {
            SpecialKind::DefaultCtor => !state.is_deleted() && state != MemberState::NotDeclared,
            SpecialKind::MoveCtor => movable(state, self.get(SpecialKind::CopyCtor).state),
            SpecialKind::MoveAssign => movable(state, self.get(SpecialKind::CopyAssign).state),
            _ => !state.is_deleted(),
        }
    }

    /// The member that actually runs for `kind`; moves fall back to copies.
    fn invoked(&self, kind: SpecialKind) -> EffectiveMember {
        let member = self.get(kind);
        match (kind, member.state) {
            (SpecialKind::MoveCtor, MemberState::NotDeclared | MemberState::ImplicitlyDeleted) => {
                self.get(SpecialKind::CopyCtor)
            }
            (SpecialKind::MoveAssign, MemberState::NotDeclared | MemberState::ImplicitlyDeleted) => {
                self.get(SpecialKind::CopyAssign)
            }
            _ => member,
        }
    }

    pub fn is_trivial(&self, kind: SpecialKind) -> bool {
        self.invoked(kind).state == MemberState::Trivial
    }
}

fn index(kind: SpecialKind) -> usize {
    match kind {
        SpecialKind::DefaultCtor => 0,
        SpecialKind::CopyCtor => 1,
        SpecialKind::MoveCtor => 2,
        SpecialKind::CopyAssign => 3,
        SpecialKind::MoveAssign => 4,
        SpecialKind::Dtor => 5,
    }
}

/// A move the overload set can still satisfy through the copy.
fn movable(state: MemberState, copy: MemberState) -> bool {
    match state {
        MemberState::UserDeleted => false,
        MemberState::ImplicitlyDeleted | MemberState::NotDeclared => !copy.is_deleted(),
        _ => true,
    }
}

/// Strip array extents.
fn element_type(ty: &CppType) -> &CppType {
    match ty.unqualified() {
        CppType::Array { element, .. } => element_type(element),
        _ => ty,
    }
}

fn array_extents(ty: &CppType) -> Vec<u64> {
    let mut extents = Vec::new();
    let mut current = ty.unqualified();
    while let CppType::Array { element, size } = current {
        extents.push(size.unwrap_or(0));
        current = element.unqualified();
    }
    extents
}

/// `{src[0], src[1]}` for every element of an array, with `wrap` applied to
/// each element expression.
pub(crate) fn array_elements(source: &str, extents: &[u64], wrap: &dyn Fn(String) -> String) -> String {
    match extents.split_first() {
        None => wrap(source.to_string()),
        Some((&n, rest)) => {
            let items: Vec<String> = (0..n)
                .map(|i| array_elements(&format!("{}[{}]", source, i), rest, wrap))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

/// The injected class name: `Box` for `ns::Box<int>`.
pub(crate) fn ctor_name(class: &str) -> &str {
    let simple = last_component(class);
    simple.split('<').next().unwrap_or(simple)
}

impl<'c, 'u> Context<'c, 'u> {
    /// Effective special members of a class type, or `None` for types the
    /// unit does not define.
    pub(crate) fn effective_members(&mut self, ty: &CppType) -> Result<Option<EffectiveMembers>> {
        let element = element_type(ty.non_reference());
        let key = self.namer.print_type(element.decayed());
        if let Some(cached) = self.specials.get(&key) {
            return Ok(Some(*cached));
        }
        let tree = self.tree();
        let Some((_, record)) = tree.record_for_type(element) else {
            return Ok(None);
        };
        let members = self.compute_members(&key, record)?;
        self.specials.insert(key, members);
        Ok(Some(members))
    }

    fn compute_members(&mut self, class: &str, record: &RecordDecl) -> Result<EffectiveMembers> {
        let mut members = [EffectiveMember {
            state: MemberState::NotDeclared,
            noexcept: false,
            is_virtual: false,
        }; 6];
        let virtual_base_dtor = self.has_virtual_base_dtor(record)?;
        let declared_virtual_dtor = record
            .methods()
            .any(|(_, f)| f.kind == FunctionKind::Destructor && f.specifiers.is_virtual);

        for kind in SpecialKind::ALL {
            let reported = record.special_members.get(kind);
            let state = reported.state;
            let noexcept = match state {
                MemberState::ImplicitlyDefaulted | MemberState::Trivial => {
                    if record.tag != RecordTag::Union {
                        if let Some(reason) = self.deletion_reason(record, kind)? {
                            return Err(SynthesisError::IllFormedDeletion {
                                class: class.to_string(),
                                member: kind.describe(),
                                reason,
                            }
                            .into());
                        }
                    }
                    match reported.noexcept {
                        Some(hint) => hint,
                        None => self.implicit_noexcept(record, kind)?,
                    }
                }
                _ => reported.noexcept.unwrap_or(kind == SpecialKind::Dtor),
            };
            members[index(kind)] = EffectiveMember {
                state,
                noexcept,
                is_virtual: reported.is_virtual
                    || (kind == SpecialKind::Dtor && (virtual_base_dtor || declared_virtual_dtor)),
            };
        }
        Ok(EffectiveMembers { members })
    }

    fn has_virtual_base_dtor(&mut self, record: &RecordDecl) -> Result<bool> {
        for base in &record.bases {
            if let Some(members) = self.effective_members(&base.ty)? {
                if members.get(SpecialKind::Dtor).is_virtual {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Why the language deletes an implicitly defaulted `kind`, if it does.
    fn deletion_reason(&mut self, record: &RecordDecl, kind: SpecialKind) -> Result<Option<String>> {
        for base in &record.bases {
            let what = format!("base `{}`", self.namer.print_type(&base.ty));
            if let Some(reason) = self.subobject_reason(&base.ty, kind, &what)? {
                return Ok(Some(reason));
            }
        }
        for (decl, field) in record.fields() {
            let ty = &field.ty;
            let name = &decl.name;
            let initialized = field.default_init.is_some();
            match kind {
                SpecialKind::DefaultCtor if ty.is_reference() && !initialized => {
                    return Ok(Some(format!("reference member `{}` has no initializer", name)));
                }
                SpecialKind::DefaultCtor if ty.is_const() && !ty.is_class_like() && !initialized => {
                    return Ok(Some(format!("const member `{}` has no initializer", name)));
                }
                SpecialKind::CopyCtor if ty.is_rvalue_reference() => {
                    return Ok(Some(format!("rvalue reference member `{}`", name)));
                }
                SpecialKind::CopyAssign | SpecialKind::MoveAssign if ty.is_reference() => {
                    return Ok(Some(format!("reference member `{}`", name)));
                }
                SpecialKind::CopyAssign | SpecialKind::MoveAssign
                    if ty.is_const() || element_type(ty).is_const() =>
                {
                    return Ok(Some(format!("const member `{}`", name)));
                }
                _ => {}
            }
            if ty.is_reference() || (kind == SpecialKind::DefaultCtor && initialized) {
                continue;
            }
            let what = format!("member `{}`", name);
            if let Some(reason) = self.subobject_reason(element_type(ty), kind, &what)? {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    fn subobject_reason(&mut self, ty: &CppType, kind: SpecialKind, what: &str) -> Result<Option<String>> {
        let Some(members) = self.effective_members(ty)? else {
            return Ok(None);
        };
        if !members.usable(kind) {
            return Ok(Some(format!("the {} of {} is not available", kind.describe(), what)));
        }
        let constructs = matches!(
            kind,
            SpecialKind::DefaultCtor | SpecialKind::CopyCtor | SpecialKind::MoveCtor
        );
        if constructs && members.get(SpecialKind::Dtor).state.is_deleted() {
            return Ok(Some(format!("the destructor of {} is deleted", what)));
        }
        Ok(None)
    }

    /// Conjunction of the noexcept-ness of everything `kind` invokes.
    fn implicit_noexcept(&mut self, record: &RecordDecl, kind: SpecialKind) -> Result<bool> {
        for base in &record.bases {
            if !self.subobject_noexcept(&base.ty, kind)? {
                return Ok(false);
            }
        }
        for (_, field) in record.fields() {
            if field.ty.is_reference() {
                continue;
            }
            if kind == SpecialKind::DefaultCtor {
                if let Some(init) = &field.default_init {
                    if may_throw(&init.kind) {
                        return Ok(false);
                    }
                    continue;
                }
            }
            if !self.subobject_noexcept(element_type(&field.ty), kind)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn subobject_noexcept(&mut self, ty: &CppType, kind: SpecialKind) -> Result<bool> {
        if !ty.is_class_like() {
            return Ok(true);
        }
        match self.effective_members(ty)? {
            Some(members) => Ok(members.invoked(kind).noexcept),
            // Classes outside the unit: destruction and moves are assumed not
            // to throw, copies and default construction may.
            None => Ok(matches!(
                kind,
                SpecialKind::Dtor | SpecialKind::MoveCtor | SpecialKind::MoveAssign
            )),
        }
    }

    /// Declarations (and bodies) of the implicit special members of a class.
    pub(crate) fn render_special_members(
        &mut self,
        self_ty: &CppType,
        record: &RecordDecl,
        display: &str,
    ) -> Result<FragmentBuffer> {
        let Some(members) = self.effective_members(self_ty)? else {
            return Ok(FragmentBuffer::new());
        };
        let polymorphic = self.vtable_for_type(self_ty)?.is_some();
        let class = ctor_name(display).to_string();
        let mut out = FragmentBuffer::new();

        for kind in SpecialKind::ALL {
            let member = members.get(kind);
            let trivial_body = member.state == MemberState::Trivial
                || record.tag == RecordTag::Union;
            match member.state {
                MemberState::ImplicitlyDeleted => {
                    out.line(format!("{} = delete;", signature(kind, &class, display, &member, false)));
                }
                MemberState::Trivial | MemberState::ImplicitlyDefaulted if trivial_body => {
                    out.line(format!("// {}", self.member_order(record, kind)));
                    out.line(format!("{} = default;", signature(kind, &class, display, &member, false)));
                }
                MemberState::ImplicitlyDefaulted => {
                    out.line(signature(kind, &class, display, &member, true));
                    self.special_body(kind, record, polymorphic, &mut out)?;
                }
                _ => {}
            }
        }

        if record.is_aggregate && !out.is_empty() {
            let mut commented = FragmentBuffer::new();
            commented.line("// implicitly declared special members of an aggregate:");
            commented.append(out.into_comment());
            return Ok(commented);
        }
        Ok(out)
    }

    fn member_order(&mut self, record: &RecordDecl, kind: SpecialKind) -> String {
        let mut parts: Vec<String> = record
            .bases
            .iter()
            .map(|b| self.namer.print_type(&b.ty))
            .collect();
        parts.extend(record.fields().map(|(decl, _)| decl.name.clone()));
        let verb = match kind {
            SpecialKind::DefaultCtor => "initializes",
            SpecialKind::CopyCtor | SpecialKind::CopyAssign => "copies",
            SpecialKind::MoveCtor | SpecialKind::MoveAssign => "moves",
            SpecialKind::Dtor => {
                parts.reverse();
                "destroys"
            }
        };
        if parts.is_empty() {
            format!("{}: nothing", verb)
        } else {
            format!("{}: {}", verb, parts.join(", "))
        }
    }

    fn special_body(
        &mut self,
        kind: SpecialKind,
        record: &RecordDecl,
        polymorphic: bool,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        match kind {
            SpecialKind::DefaultCtor | SpecialKind::CopyCtor | SpecialKind::MoveCtor => {
                let (inits, notes) = self.ctor_inits(kind, record, polymorphic)?;
                if !inits.is_empty() {
                    out.line(format!(": {}", inits.join(", ")));
                }
                out.open_brace();
                for note in notes {
                    out.line(note);
                }
                out.close_brace("");
            }
            SpecialKind::CopyAssign | SpecialKind::MoveAssign => {
                out.open_brace();
                self.assign_body(kind, record, out)?;
                out.line("return *this;");
                out.close_brace("");
            }
            SpecialKind::Dtor => {
                out.open_brace();
                self.dtor_body(record, polymorphic, out)?;
                out.close_brace("");
            }
        }
        Ok(())
    }

    fn ctor_inits(
        &mut self,
        kind: SpecialKind,
        record: &RecordDecl,
        polymorphic: bool,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut inits = Vec::new();
        let mut notes = Vec::new();
        for base in &record.bases {
            let name = self.type_name(&base.ty)?;
            let init = match kind {
                SpecialKind::DefaultCtor => {
                    let trivial = self
                        .effective_members(&base.ty)?
                        .map_or(false, |m| m.is_trivial(SpecialKind::DefaultCtor));
                    if trivial {
                        notes.push(format!("/* {}: trivial default construction */", name));
                        continue;
                    }
                    format!("{}()", name)
                }
                SpecialKind::CopyCtor => format!("{}(static_cast<const {} &>(__other))", name, name),
                _ => format!("{}(static_cast<{} &&>(__other))", name, name),
            };
            inits.push(init);
        }
        if polymorphic {
            notes.insert(0, "/* vptr = vtable of this class, set after the bases */".to_string());
        }

        for (decl, field) in record.fields() {
            let name = &decl.name;
            match kind {
                SpecialKind::DefaultCtor => match self.field_default_init(decl, field)? {
                    Some(init) => inits.push(init),
                    None => notes.push(format!("/* {}: default-initialized */", name)),
                },
                SpecialKind::CopyCtor => {
                    if field.ty.is_array() {
                        let extents = array_extents(&field.ty);
                        let source = format!("__other.{}", name);
                        inits.push(format!("{}{}", name, array_elements(&source, &extents, &|e: String| e)));
                    } else {
                        inits.push(format!("{}(__other.{})", name, name));
                    }
                }
                _ => {
                    if field.ty.is_lvalue_reference() {
                        inits.push(format!("{}(__other.{})", name, name));
                    } else if field.ty.is_array() {
                        let extents = array_extents(&field.ty);
                        let element = self.type_name(element_type(&field.ty))?;
                        let source = format!("__other.{}", name);
                        let wrap = |e: String| format!("static_cast<{} &&>({})", element, e);
                        inits.push(format!("{}{}", name, array_elements(&source, &extents, &wrap)));
                    } else {
                        let target = self.type_name(&field.ty.non_reference().clone().rvalue_ref())?;
                        inits.push(format!("{}(static_cast<{}>(__other.{}))", name, target, name));
                    }
                }
            }
        }
        Ok((inits, notes))
    }

    /// Initializer of a field in the implicit default constructor, or `None`
    /// when the field is left default-initialized.
    fn field_default_init(&mut self, decl: &Decl, field: &FieldDecl) -> Result<Option<String>> {
        let name = &decl.name;
        if let Some(init) = &field.default_init {
            // Rendered once with the class body, so a lambda is not lowered twice.
            let text = match self.field_inits.remove(&decl.id) {
                Some(text) => text,
                None => {
                    let (prelude, text) = self.with_prelude(|cx| cx.expr(init))?;
                    self.hoist(prelude);
                    text
                }
            };
            let init = match &init.kind {
                ExprKind::InitList(_) => format!("{}{}", name, text),
                _ => format!("{}({})", name, text),
            };
            return Ok(Some(init));
        }
        if !field.ty.is_class_like() || field.ty.is_array() {
            return Ok(None);
        }
        let trivial = self
            .effective_members(&field.ty)?
            .map_or(false, |m| m.is_trivial(SpecialKind::DefaultCtor));
        if trivial {
            Ok(None)
        } else {
            Ok(Some(format!("{}()", name)))
        }
    }

    fn assign_body(&mut self, kind: SpecialKind, record: &RecordDecl, out: &mut FragmentBuffer) -> Result<()> {
        let moving = kind == SpecialKind::MoveAssign;
        for base in &record.bases {
            let name = self.type_name(&base.ty)?;
            if moving {
                out.line(format!("{}::operator=(static_cast<{} &&>(__other));", name, name));
            } else {
                out.line(format!("{}::operator=(static_cast<const {} &>(__other));", name, name));
            }
        }
        for (decl, field) in record.fields() {
            let name = &decl.name;
            if field.ty.is_array() {
                let extents = array_extents(&field.ty);
                let element = self.type_name(element_type(&field.ty))?;
                let mut subscript = String::new();
                for (depth, extent) in extents.iter().enumerate() {
                    let i = format!("__i{}", depth);
                    out.line(format!(
                        "for(unsigned long {} = 0; {} < {}; ++{})",
                        i, i, extent, i
                    ));
                    out.indent();
                    subscript.push_str(&format!("[{}]", i));
                }
                let source = format!("__other.{}{}", name, subscript);
                let value = if moving {
                    format!("static_cast<{} &&>({})", element, source)
                } else {
                    source
                };
                out.line(format!("{}{} = {};", name, subscript, value));
                for _ in &extents {
                    out.dedent();
                }
            } else if moving {
                let target = self.type_name(&field.ty.clone().rvalue_ref())?;
                out.line(format!("{} = static_cast<{}>(__other.{});", name, target, name));
            } else {
                out.line(format!("{} = __other.{};", name, name));
            }
        }
        Ok(())
    }

    fn dtor_body(&mut self, record: &RecordDecl, polymorphic: bool, out: &mut FragmentBuffer) -> Result<()> {
        let fields: Vec<(&Decl, &FieldDecl)> = record.fields().collect();
        for (decl, field) in fields.into_iter().rev() {
            out.line(self.destruction_note(&decl.name, &field.ty)?);
        }
        for base in record.bases.iter().rev() {
            let name = self.namer.print_type(&base.ty);
            if self.vtable_for_type(&base.ty)?.is_some() {
                out.line(format!("/* vptr = vtable of {} */", name));
            }
            out.line(format!("/* {}::~{}(); */", name, ctor_name(&name)));
        }
        if polymorphic && record.bases.is_empty() {
            out.line("/* vptr reset before the members are gone */");
        }
        Ok(())
    }

    /// Comment naming what destroying `name` of type `ty` does.
    pub(crate) fn destruction_note(&mut self, name: &str, ty: &CppType) -> Result<String> {
        if ty.is_reference() || !element_type(ty).is_class_like() {
            return Ok(format!("/* {}: trivially destroyed */", name));
        }
        let element = element_type(ty);
        let trivial = self
            .effective_members(element)?
            .map_or(false, |m| m.is_trivial(SpecialKind::Dtor));
        if trivial {
            return Ok(format!("/* {}: trivially destroyed */", name));
        }
        let simple = element.simple_name().map(|s| ctor_name(s).to_string()).unwrap_or_default();
        if ty.is_array() {
            Ok(format!("/* {}: each element's ~{}() in reverse order */", name, simple))
        } else {
            Ok(format!("/* {}.~{}(); */", name, simple))
        }
    }
}

/// Default member initializers that call functions may throw.
fn may_throw(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Call { .. }
            | ExprKind::MemberCall { .. }
            | ExprKind::OperatorCall { .. }
            | ExprKind::Construct { .. }
            | ExprKind::UserLiteral { .. }
    )
}

fn signature(kind: SpecialKind, class: &str, display: &str, member: &EffectiveMember, named: bool) -> String {
    let other = if named { " __other" } else { "" };
    let noexcept = if member.noexcept { " noexcept" } else { "" };
    match kind {
        SpecialKind::DefaultCtor => format!("inline {}(){}", class, noexcept),
        SpecialKind::CopyCtor => format!("inline {}(const {} &{}){}", class, display, other, noexcept),
        SpecialKind::MoveCtor => format!("inline {}({} &&{}){}", class, display, other, noexcept),
        SpecialKind::CopyAssign => format!(
            "inline {} & operator=(const {} &{}){}",
            display, display, other, noexcept
        ),
        SpecialKind::MoveAssign => {
            format!("inline {} & operator=({} &&{}){}", display, display, other, noexcept)
        }
        SpecialKind::Dtor => {
            let virtual_ = if member.is_virtual { "virtual " } else { "" };
            format!("{}inline ~{}(){}", virtual_, class, noexcept)
        }
    }
}
