//! Declarations: functions, variables and the simple namespace-level kinds.

use crate::consteval::static_assert_comment;
use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::Result;
use unveil_tree::{
    last_component, qualify, CppType, CtorInit, Decl, DeclKind, EnumDecl, Expr, ExprKind,
    FunctionDecl, FunctionKind, InitStyle, SpecialKind, SpecializationDecl, TemplateArg, UsingKind,
    VarDecl,
};

/// Function-pointer and array returns only read correctly in trailing form.
fn needs_trailing_return(ty: &CppType) -> bool {
    match ty.non_reference() {
        CppType::Pointer(pointee) => matches!(
            pointee.unqualified(),
            CppType::Function { .. } | CppType::Array { .. }
        ),
        CppType::Array { .. } | CppType::Function { .. } => true,
        _ => false,
    }
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn synth_decl(&mut self, decl: &Decl, out: &mut FragmentBuffer) -> Result<()> {
        self.location = decl.location.clone();
        tracing::trace!(name = %decl.name, kind = decl.kind_name(), "declaration");
        match &decl.kind {
            DeclKind::Function(func) => self.synth_function(decl, func, &decl.name, false, out),
            DeclKind::Record(record) => {
                let self_ty = CppType::named(qualify(self.namespace_path(), None, &decl.name));
                self.synth_record(decl, record, &decl.name, false, &self_ty, out)
            }
            DeclKind::Var(var) => self.synth_var(decl, var, &decl.name, false, out),
            DeclKind::Field(_) => Err(self.unsupported("field outside a class")),
            DeclKind::Template(template) => {
                out.verbatim(&template.pattern);
                Ok(())
            }
            DeclKind::ExplicitSpecialization(spec) => self.synth_explicit_specialization(spec, out),
            DeclKind::Namespace(_) => Err(self.unsupported("namespace inside a function")),
            DeclKind::Using(UsingKind::Directive(ns)) => {
                out.line(format!("using namespace {};", ns));
                Ok(())
            }
            DeclKind::Using(UsingKind::Declaration(name)) => {
                out.line(format!("using {};", name));
                Ok(())
            }
            DeclKind::TypeAlias(ty) => {
                let ty = self.type_name(ty)?;
                out.line(format!("using {} = {};", decl.name, ty));
                Ok(())
            }
            DeclKind::Enum(e) => self.synth_enum(decl, e, out),
            DeclKind::StaticAssert(assertion) => {
                out.line(static_assert_comment(assertion));
                Ok(())
            }
            DeclKind::Decomposition(decomposition) => self.synth_decomposition(decomposition, out),
            DeclKind::Unsupported { kind } => Err(self.unsupported(kind.clone())),
        }
    }

    /// A user-written `template<>` declaration, printed where it appears.
    fn synth_explicit_specialization(&mut self, spec: &SpecializationDecl, out: &mut FragmentBuffer) -> Result<()> {
        self.note_template_args(&spec.args)?;
        let display = self
            .namer
            .print_name(last_component(&spec.template), Some(&spec.args));
        self.synth_specialized_decl(&spec.decl, &spec.template, &display, &spec.args, out)
    }

    /// `template<>` followed by the specialized function, class or variable.
    pub(crate) fn synth_specialized_decl(
        &mut self,
        decl: &Decl,
        template: &str,
        display: &str,
        args: &[TemplateArg],
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        self.location = decl.location.clone();
        match &decl.kind {
            DeclKind::Function(func) => self.synth_function(decl, func, display, true, out),
            DeclKind::Record(record) => {
                let self_ty = CppType::instantiation(template, args.to_vec());
                self.synth_record(decl, record, display, true, &self_ty, out)
            }
            DeclKind::Var(var) => self.synth_var(decl, var, display, true, out),
            _ => Err(self.unsupported(format!("specialization of a {}", decl.kind_name()))),
        }
    }

    pub(crate) fn synth_function(
        &mut self,
        decl: &Decl,
        func: &FunctionDecl,
        display: &str,
        specialization: bool,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        let key = format!("fn:{}#{}", display, decl.id.0);
        self.enter_function(&key, func.specifiers.is_consteval, None);
        for param in &func.params {
            self.reserve_local(&param.name, param.id)?;
        }
        let (prelude, (head, inits)) = self.with_prelude(|cx| {
            let head = cx.function_head(func, display, specialization)?;
            let inits = cx.ctor_init_list(&func.ctor_inits)?;
            Ok((head, inits))
        })?;
        out.append(prelude);
        if specialization {
            out.line("template<>");
        }
        let defined_elsewhere = func.specifiers.is_deleted || func.specifiers.is_defaulted;
        match &func.body {
            Some(body) if !defined_elsewhere => {
                out.line(head);
                if !inits.is_empty() {
                    out.line(format!(": {}", inits));
                }
                self.function_body(body, out)?;
            }
            _ => out.line(format!("{};", head)),
        }
        self.leave_function();
        Ok(())
    }

    fn function_head(&mut self, func: &FunctionDecl, display: &str, specialization: bool) -> Result<String> {
        let spec = &func.specifiers;
        let mut head = String::new();
        for (present, keyword) in [
            (spec.is_static, "static "),
            (spec.is_virtual, "virtual "),
            (spec.is_explicit, "explicit "),
            (spec.is_inline, "inline "),
        ] {
            if present {
                head.push_str(keyword);
            }
        }
        if spec.is_consteval {
            head.push_str("consteval ");
        } else if spec.is_constexpr {
            head.push_str("constexpr ");
        }

        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let mut text = self.declarator(&param.ty, &param.name)?;
            if let (Some(default), false) = (&param.default, specialization) {
                text.push_str(&format!(" = {}", self.expr(default)?));
            }
            params.push(text);
        }
        let call = format!("{}({})", display, params.join(", "));

        let signature = match func.kind {
            FunctionKind::Constructor | FunctionKind::Destructor | FunctionKind::Conversion => call,
            _ if func.return_type.mentions_closure() => format!("auto {}", call),
            _ if needs_trailing_return(&func.return_type) => {
                format!("auto {} -> {}", call, self.type_name(&func.return_type)?)
            }
            _ => self.declarator(&func.return_type, &call)?,
        };
        head.push_str(&signature);

        for (present, suffix) in [
            (spec.is_const, " const"),
            (spec.is_noexcept, " noexcept"),
            (spec.is_override, " override"),
            (spec.is_pure, " = 0"),
            (spec.is_deleted, " = delete"),
            (spec.is_defaulted, " = default"),
        ] {
            if present {
                head.push_str(suffix);
            }
        }
        Ok(head)
    }

    fn ctor_init_list(&mut self, inits: &[CtorInit]) -> Result<String> {
        let mut rendered = Vec::with_capacity(inits.len());
        for init in inits {
            let args = self.args(&init.args)?;
            if init.list_init {
                rendered.push(format!("{}{{{}}}", init.target, args));
            } else {
                rendered.push(format!("{}({})", init.target, args));
            }
        }
        Ok(rendered.join(", "))
    }

    pub(crate) fn synth_var(
        &mut self,
        decl: &Decl,
        var: &VarDecl,
        name: &str,
        specialization: bool,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        if var.is_static && !specialization && self.in_function() {
            if let Some(class) = self.guarded_static_class(var)? {
                return self.synth_guarded_static(decl, var, name, &class, out);
            }
        }
        let (prelude, text) = self.with_prelude(|cx| cx.var_text(decl, var, name))?;
        out.append(prelude);
        if specialization {
            out.line("template<>");
        }
        out.line(format!("{};", text));
        Ok(())
    }

    /// The printed class type of a local static that needs a guarded
    /// initialization, i.e. one with a non-trivial destructor.
    fn guarded_static_class(&mut self, var: &VarDecl) -> Result<Option<String>> {
        let ty = &var.ty;
        if var.is_constexpr || ty.is_reference() || ty.is_array() || !ty.is_class_like() {
            return Ok(None);
        }
        match self.effective_members(ty)? {
            Some(members) if !members.is_trivial(SpecialKind::Dtor) => Ok(Some(self.type_name(ty.unqualified())?)),
            _ => Ok(None),
        }
    }

    /// Raw storage, a guard and a placement new, as the Itanium ABI
    /// initializes a local static exactly once.
    fn synth_guarded_static(
        &mut self,
        decl: &Decl,
        var: &VarDecl,
        name: &str,
        class: &str,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        self.reserve_local(name, decl.id)?;
        let storage = self.fresh_local(name)?;
        let guard = self.fresh_local(&format!("{}_guard", name))?;
        tracing::trace!(var = name, storage = %storage, "guarded local static");

        let (prelude, construct) = self.with_prelude(|cx| match &var.init {
            None => Ok(format!("{}()", class)),
            Some(Expr {
                kind: ExprKind::Construct { args, list_init, .. },
                ..
            }) => {
                let args = cx.args(args)?;
                if *list_init {
                    Ok(format!("{}{{{}}}", class, args))
                } else {
                    Ok(format!("{}({})", class, args))
                }
            }
            Some(init) => Ok(format!("{}({})", class, cx.expr(init)?)),
        })?;

        out.line(format!("alignas({}) static char {}[sizeof({})];", class, storage, class));
        out.line(format!("static uint64_t {};", guard));
        out.append(prelude);
        out.line(format!("if(({} & 0xff) == 0)", guard));
        out.open_brace();
        out.line(format!("if(__cxa_guard_acquire(&{}))", guard));
        out.open_brace();
        out.line("try");
        out.open_brace();
        out.line(format!("new (&{}) {};", storage, construct));
        out.close_brace("");
        out.line("catch(...)");
        out.open_brace();
        out.line(format!("__cxa_guard_abort(&{});", guard));
        out.line("throw;");
        out.close_brace("");
        out.line(format!("__cxa_guard_release(&{});", guard));
        out.line(format!(
            "/* __cxa_atexit({}::~{}, &{}, &__dso_handle); */",
            class,
            super::special::ctor_name(class),
            storage
        ));
        out.close_brace("");
        out.close_brace("");

        self.static_locals
            .insert(decl.id, format!("(*reinterpret_cast<{} *>({}))", class, storage));
        Ok(())
    }

    /// `T name = init` without the semicolon. Registers the name in the
    /// current scope and, for automatic locals, in the enclosing block.
    pub(crate) fn var_text(&mut self, decl: &Decl, var: &VarDecl, name: &str) -> Result<String> {
        self.reserve_local(name, decl.id)?;
        // The initializer first: a lambda there names the closure type the
        // declarator prints.
        let init = match &var.init {
            Some(init) => self.initializer(init, var.init_style)?,
            None => String::new(),
        };
        let mut text = String::new();
        for (present, keyword) in [
            (var.is_static, "static "),
            (var.is_inline, "inline "),
            (var.is_constexpr, "constexpr "),
        ] {
            if present {
                text.push_str(keyword);
            }
        }
        text.push_str(&self.declarator(&var.ty, name)?);
        if var.is_nrvo {
            text.push_str(" /* NRVO variable */");
        }
        text.push_str(&init);
        if self.in_function() && !var.is_static {
            self.track_local(name, &var.ty);
        }
        Ok(text)
    }

    fn initializer(&mut self, init: &Expr, style: InitStyle) -> Result<String> {
        match (style, &init.kind) {
            (InitStyle::Copy, _) => Ok(format!(" = {}", self.expr(init)?)),
            (
                InitStyle::Direct,
                ExprKind::Construct {
                    args,
                    list_init: false,
                    ..
                },
            ) if !args.is_empty() => Ok(format!("({})", self.args(args)?)),
            (InitStyle::Direct, _) => Ok(format!("({})", self.expr(init)?)),
            (InitStyle::List, ExprKind::Construct { args, .. }) | (InitStyle::List, ExprKind::InitList(args)) => {
                Ok(format!("{{{}}}", self.args(args)?))
            }
            (InitStyle::List, _) => Ok(format!("{{{}}}", self.expr(init)?)),
        }
    }

    /// Enumerators always carry their value.
    fn synth_enum(&mut self, decl: &Decl, e: &EnumDecl, out: &mut FragmentBuffer) -> Result<()> {
        let mut head = if e.is_scoped {
            format!("enum class {}", decl.name)
        } else {
            format!("enum {}", decl.name)
        };
        if let Some(underlying) = &e.underlying {
            head.push_str(&format!(" : {}", self.type_name(underlying)?));
        }
        out.line(head);
        out.open_brace();
        for enumerator in &e.enumerators {
            out.line(format!("{} = {},", enumerator.name, enumerator.value));
        }
        out.close_brace(";");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_return_for_function_pointers() {
        let fptr = CppType::Function {
            return_type: Box::new(CppType::int()),
            params: vec![CppType::int()],
            is_variadic: false,
            is_noexcept: false,
        }
        .ptr();
        assert!(needs_trailing_return(&fptr));
        assert!(needs_trailing_return(&CppType::int().array(3).ref_()));
        assert!(!needs_trailing_return(&CppType::int().ptr()));
        assert!(!needs_trailing_return(&CppType::named("Point")));
    }
}
