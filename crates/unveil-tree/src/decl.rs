//! Resolved declarations.

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::types::{CppType, TemplateArg};
use serde::{Deserialize, Serialize};
use unveil_common::SourceLocation;

/// Identity of a declared entity, unique within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// C++ access specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

impl AccessSpecifier {
    pub fn spelling(self) -> &'static str {
        match self {
            AccessSpecifier::Public => "public",
            AccessSpecifier::Protected => "protected",
            AccessSpecifier::Private => "private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    #[serde(default)]
    pub location: SourceLocation,
    /// Access of a class member; `None` outside classes.
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Function(FunctionDecl),
    Record(RecordDecl),
    Field(FieldDecl),
    Var(VarDecl),
    Template(TemplateDecl),
    ExplicitSpecialization(SpecializationDecl),
    Namespace(NamespaceDecl),
    Using(UsingKind),
    TypeAlias(CppType),
    Enum(EnumDecl),
    StaticAssert(StaticAssertDecl),
    Decomposition(DecompositionDecl),
    /// A declaration the front end could not map onto this model.
    Unsupported { kind: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: CppType,
    #[serde(default)]
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    #[default]
    Free,
    Method,
    Constructor,
    Destructor,
    Conversion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionSpecifiers {
    pub is_inline: bool,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub is_consteval: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_override: bool,
    pub is_noexcept: bool,
    /// const-qualified member function
    pub is_const: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
    pub is_explicit: bool,
}

/// One entry of a constructor's member initializer list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtorInit {
    /// Member name, or the spelled base class.
    pub target: String,
    pub args: Vec<Expr>,
    #[serde(default)]
    pub list_init: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub return_type: CppType,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub kind: FunctionKind,
    #[serde(default)]
    pub specifiers: FunctionSpecifiers,
    #[serde(default)]
    pub ctor_inits: Vec<CtorInit>,
    /// Compound body; `None` for declarations.
    #[serde(default)]
    pub body: Option<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTag {
    Struct,
    Class,
    Union,
}

impl RecordTag {
    pub fn keyword(self) -> &'static str {
        match self {
            RecordTag::Struct => "struct",
            RecordTag::Class => "class",
            RecordTag::Union => "union",
        }
    }

    pub fn default_access(self) -> AccessSpecifier {
        match self {
            RecordTag::Class => AccessSpecifier::Private,
            RecordTag::Struct | RecordTag::Union => AccessSpecifier::Public,
        }
    }
}

fn public() -> AccessSpecifier {
    AccessSpecifier::Public
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSpec {
    pub ty: CppType,
    #[serde(default = "public")]
    pub access: AccessSpecifier,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub tag: RecordTag,
    #[serde(default)]
    pub bases: Vec<BaseSpec>,
    /// Fields, methods and nested declarations in declaration order.
    #[serde(default)]
    pub members: Vec<Decl>,
    #[serde(default)]
    pub special_members: SpecialMemberSet,
    #[serde(default)]
    pub is_aggregate: bool,
    #[serde(default = "yes")]
    pub is_definition: bool,
}

impl RecordDecl {
    pub fn fields(&self) -> impl Iterator<Item = (&Decl, &FieldDecl)> {
        self.members.iter().filter_map(|m| match &m.kind {
            DeclKind::Field(field) => Some((m, field)),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = (&Decl, &FunctionDecl)> {
        self.members.iter().filter_map(|m| match &m.kind {
            DeclKind::Function(func) => Some((m, func)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub ty: CppType,
    /// In-class default member initializer.
    #[serde(default)]
    pub default_init: Option<Expr>,
    #[serde(default)]
    pub is_mutable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStyle {
    /// `T x = e;`
    #[default]
    Copy,
    /// `T x(args);`
    Direct,
    /// `T x{args};`
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: CppType,
    #[serde(default)]
    pub init: Option<Expr>,
    #[serde(default)]
    pub init_style: InitStyle,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_constexpr: bool,
    #[serde(default)]
    pub is_inline: bool,
    /// The front end applied the named return value optimization to this variable.
    #[serde(default)]
    pub is_nrvo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Function,
    Class,
    Variable,
    Alias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDecl {
    pub kind: TemplateKind,
    /// The template declaration as written, printed verbatim.
    pub pattern: String,
    /// Specializations the front end instantiated for this unit.
    #[serde(default)]
    pub instantiations: Vec<Instantiation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instantiation {
    pub args: Vec<TemplateArg>,
    /// The instantiated function, class or variable.
    pub decl: Decl,
}

/// A user-written `template<>` specialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationDecl {
    /// Qualified name of the primary template.
    pub template: String,
    pub args: Vec<TemplateArg>,
    pub decl: Box<Decl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    #[serde(default)]
    pub is_inline: bool,
    #[serde(default)]
    pub members: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsingKind {
    /// `using namespace ns;`
    Directive(String),
    /// `using ns::name;`
    Declaration(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    #[serde(default)]
    pub is_scoped: bool,
    #[serde(default)]
    pub underlying: Option<CppType>,
    pub enumerators: Vec<Enumerator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAssertDecl {
    /// Condition as written.
    pub condition: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Result of the front end's evaluation.
    pub passed: bool,
}

/// Structured binding declaration: `auto& [a, b] = init;`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionDecl {
    /// Type of the hidden variable, e.g. `Point &` or `std::pair<int, int>`.
    pub ty: CppType,
    pub init: Expr,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: DeclId,
    pub name: String,
    /// Type of the bound element (member type, array element, or tuple element).
    pub ty: CppType,
    pub access: BindingAccess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingAccess {
    /// Aggregate member.
    Field(String),
    /// Array element.
    Element(u64),
    /// Tuple-like element, accessed through `get<index>`.
    Tuple {
        index: u64,
        #[serde(default)]
        getter: Option<TupleGetter>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TupleGetter {
    /// `e.get<i>()`
    Member,
    /// Free function found by lookup, e.g. `std::get`.
    Free(String),
}

/// State of one special member function as reported by the front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    UserProvided,
    UserDeleted,
    ImplicitlyDefaulted,
    ImplicitlyDeleted,
    Trivial,
    #[default]
    NotDeclared,
}

impl MemberState {
    pub fn is_deleted(self) -> bool {
        matches!(self, MemberState::UserDeleted | MemberState::ImplicitlyDeleted)
    }

    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            MemberState::ImplicitlyDefaulted | MemberState::ImplicitlyDeleted | MemberState::Trivial
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialMember {
    #[serde(default)]
    pub state: MemberState,
    /// noexcept as the front end computed it, when it did.
    #[serde(default)]
    pub noexcept: Option<bool>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl SpecialMember {
    pub fn new(state: MemberState) -> Self {
        Self {
            state,
            noexcept: None,
            is_virtual: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialKind {
    DefaultCtor,
    CopyCtor,
    MoveCtor,
    CopyAssign,
    MoveAssign,
    Dtor,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 6] = [
        SpecialKind::DefaultCtor,
        SpecialKind::CopyCtor,
        SpecialKind::MoveCtor,
        SpecialKind::CopyAssign,
        SpecialKind::MoveAssign,
        SpecialKind::Dtor,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            SpecialKind::DefaultCtor => "default constructor",
            SpecialKind::CopyCtor => "copy constructor",
            SpecialKind::MoveCtor => "move constructor",
            SpecialKind::CopyAssign => "copy assignment operator",
            SpecialKind::MoveAssign => "move assignment operator",
            SpecialKind::Dtor => "destructor",
        }
    }
}

/// The six special members of a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialMemberSet {
    pub default_ctor: SpecialMember,
    pub copy_ctor: SpecialMember,
    pub move_ctor: SpecialMember,
    pub copy_assign: SpecialMember,
    pub move_assign: SpecialMember,
    pub dtor: SpecialMember,
}

impl SpecialMemberSet {
    /// Every member in the same state.
    pub fn all(state: MemberState) -> Self {
        let member = SpecialMember::new(state);
        Self {
            default_ctor: member,
            copy_ctor: member,
            move_ctor: member,
            copy_assign: member,
            move_assign: member,
            dtor: member,
        }
    }

    pub fn get(&self, kind: SpecialKind) -> &SpecialMember {
        match kind {
            SpecialKind::DefaultCtor => &self.default_ctor,
            SpecialKind::CopyCtor => &self.copy_ctor,
            SpecialKind::MoveCtor => &self.move_ctor,
            SpecialKind::CopyAssign => &self.copy_assign,
            SpecialKind::MoveAssign => &self.move_assign,
            SpecialKind::Dtor => &self.dtor,
        }
    }

    pub fn get_mut(&mut self, kind: SpecialKind) -> &mut SpecialMember {
        match kind {
            SpecialKind::DefaultCtor => &mut self.default_ctor,
            SpecialKind::CopyCtor => &mut self.copy_ctor,
            SpecialKind::MoveCtor => &mut self.move_ctor,
            SpecialKind::CopyAssign => &mut self.copy_assign,
            SpecialKind::MoveAssign => &mut self.move_assign,
            SpecialKind::Dtor => &mut self.dtor,
        }
    }

    pub fn with(mut self, kind: SpecialKind, state: MemberState) -> Self {
        self.get_mut(kind).state = state;
        self
    }
}

impl Decl {
    pub fn new(id: DeclId, name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            id,
            name: name.into(),
            location: SourceLocation::default(),
            access: None,
            kind,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = Some(access);
        self
    }

    pub fn var(id: DeclId, name: impl Into<String>, ty: CppType, init: Option<Expr>) -> Self {
        Self::new(id, name, DeclKind::Var(VarDecl::new(ty, init)))
    }

    pub fn field(id: DeclId, name: impl Into<String>, ty: CppType) -> Self {
        Self::new(
            id,
            name,
            DeclKind::Field(FieldDecl {
                ty,
                default_init: None,
                is_mutable: false,
            }),
        )
    }

    pub fn function(id: DeclId, name: impl Into<String>, func: FunctionDecl) -> Self {
        Self::new(id, name, DeclKind::Function(func))
    }

    pub fn record(id: DeclId, name: impl Into<String>, record: RecordDecl) -> Self {
        Self::new(id, name, DeclKind::Record(record))
    }

    pub fn namespace(id: DeclId, name: impl Into<String>, members: Vec<Decl>) -> Self {
        Self::new(
            id,
            name,
            DeclKind::Namespace(NamespaceDecl {
                is_inline: false,
                members,
            }),
        )
    }

    /// Short name of the declaration kind, for diagnostics.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            DeclKind::Function(_) => "function",
            DeclKind::Record(_) => "record",
            DeclKind::Field(_) => "field",
            DeclKind::Var(_) => "variable",
            DeclKind::Template(_) => "template",
            DeclKind::ExplicitSpecialization(_) => "explicit specialization",
            DeclKind::Namespace(_) => "namespace",
            DeclKind::Using(_) => "using",
            DeclKind::TypeAlias(_) => "type alias",
            DeclKind::Enum(_) => "enum",
            DeclKind::StaticAssert(_) => "static_assert",
            DeclKind::Decomposition(_) => "structured binding",
            DeclKind::Unsupported { kind } => kind,
        }
    }
}

impl VarDecl {
    pub fn new(ty: CppType, init: Option<Expr>) -> Self {
        Self {
            ty,
            init,
            init_style: InitStyle::Copy,
            is_static: false,
            is_constexpr: false,
            is_inline: false,
            is_nrvo: false,
        }
    }
}

impl FunctionDecl {
    pub fn new(return_type: CppType, params: Vec<ParamDecl>, body: Option<Stmt>) -> Self {
        Self {
            return_type,
            params,
            kind: FunctionKind::Free,
            specifiers: FunctionSpecifiers::default(),
            ctor_inits: Vec::new(),
            body,
        }
    }

    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_specifiers(mut self, specifiers: FunctionSpecifiers) -> Self {
        self.specifiers = specifiers;
        self
    }
}

impl RecordDecl {
    pub fn new(tag: RecordTag, members: Vec<Decl>) -> Self {
        Self {
            tag,
            bases: Vec::new(),
            members,
            special_members: SpecialMemberSet::default(),
            is_aggregate: false,
            is_definition: true,
        }
    }

    pub fn with_base(mut self, ty: CppType) -> Self {
        self.bases.push(BaseSpec {
            ty,
            access: AccessSpecifier::Public,
            is_virtual: false,
        });
        self
    }

    pub fn with_special_members(mut self, special_members: SpecialMemberSet) -> Self {
        self.special_members = special_members;
        self
    }

    pub fn aggregate(mut self) -> Self {
        self.is_aggregate = true;
        self
    }
}

impl ParamDecl {
    pub fn new(id: DeclId, name: impl Into<String>, ty: CppType) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            default: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_member_set_accessors() {
        let set = SpecialMemberSet::all(MemberState::Trivial)
            .with(SpecialKind::Dtor, MemberState::UserProvided);
        assert_eq!(set.get(SpecialKind::CopyCtor).state, MemberState::Trivial);
        assert_eq!(set.get(SpecialKind::Dtor).state, MemberState::UserProvided);
        assert!(MemberState::ImplicitlyDeleted.is_deleted());
        assert!(!MemberState::UserProvided.is_implicit());
    }

    #[test]
    fn test_record_fields_in_declaration_order() {
        let record = RecordDecl::new(
            RecordTag::Struct,
            vec![
                Decl::field(DeclId(1), "x", CppType::int()),
                Decl::function(
                    DeclId(2),
                    "len",
                    FunctionDecl::new(CppType::int(), vec![], None).with_kind(FunctionKind::Method),
                ),
                Decl::field(DeclId(3), "y", CppType::int()),
            ],
        );
        let names: Vec<_> = record.fields().map(|(d, _)| d.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(record.methods().count(), 1);
    }

    #[test]
    fn test_default_access() {
        assert_eq!(RecordTag::Class.default_access(), AccessSpecifier::Private);
        assert_eq!(RecordTag::Struct.default_access(), AccessSpecifier::Public);
    }
}
