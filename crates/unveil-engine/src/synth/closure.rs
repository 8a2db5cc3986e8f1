//! Lambda expressions as closure classes.
//!
//! A lambda becomes a class named `__closure_N` with one data member per
//! capture, a constructor taking the captured values in capture order, and
//! a call operator per distinct parameter-type tuple. The class definition
//! is hoisted ahead of the statement containing the lambda, and the lambda
//! expression itself becomes `__closure_N{captures...}`.

use super::special::array_elements;
use crate::context::{ClosureRewrite, Context};
use crate::emit::FragmentBuffer;
use crate::error::{Result, SynthesisError};
use rustc_hash::FxHashSet;
use unveil_tree::{Capture, CaptureKind, CppType, LambdaExpr, Stmt};

/// How one capture is stored in the closure.
struct CaptureLayout {
    member: String,
    member_ty: CppType,
    param_ty: CppType,
    init: String,
}

fn layout(capture: &Capture, member_text: impl Fn(&CppType) -> String) -> CaptureLayout {
    let (member, member_ty, param_ty) = match capture.kind {
        CaptureKind::ByRef => {
            let ty = capture.ty.non_reference().clone().ref_();
            (capture.name.clone(), ty.clone(), ty)
        }
        CaptureKind::This => ("__this".to_string(), capture.ty.clone(), capture.ty.clone()),
        CaptureKind::StarThis => {
            let ty = match &capture.ty {
                CppType::Pointer(pointee) => pointee.as_ref().clone(),
                other => other.non_reference().clone(),
            };
            ("__this".to_string(), ty.clone(), ty.ref_())
        }
        CaptureKind::Init => (capture.name.clone(), capture.ty.clone(), capture.ty.clone()),
        CaptureKind::ByCopy | CaptureKind::Unknown => {
            let ty = capture.ty.non_reference().clone();
            (capture.name.clone(), ty.clone(), ty.ref_())
        }
    };
    let param = format!("_{}", member);
    let init = if capture.kind == CaptureKind::Init && !capture.ty.is_reference() {
        format!(
            "{}{{static_cast<{}>({})}}",
            member,
            member_text(&capture.ty.clone().rvalue_ref()),
            param
        )
    } else if member_ty.is_array() && !member_ty.is_reference() {
        let mut extents = Vec::new();
        let mut current = member_ty.unqualified();
        while let CppType::Array { element, size } = current {
            extents.push(size.unwrap_or(0));
            current = element.unqualified();
        }
        let elements = array_elements(&param, &extents, &|e: String| e);
        format!("{}{}", member, elements)
    } else {
        format!("{}{{{}}}", member, param)
    };
    CaptureLayout {
        member,
        member_ty,
        param_ty,
        init,
    }
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn synth_lambda(&mut self, lambda: &LambdaExpr) -> Result<String> {
        let mut ctor_args = Vec::with_capacity(lambda.captures.len());
        for capture in &lambda.captures {
            let arg = match capture.kind {
                CaptureKind::ByCopy | CaptureKind::ByRef => {
                    self.name_ref(&capture.name, capture.var, None)?
                }
                CaptureKind::This => self.this_spelling(),
                CaptureKind::StarThis => format!("*{}", self.this_spelling()),
                CaptureKind::Init => match &capture.init {
                    Some(init) => self.expr(init)?,
                    None => return Err(self.unsupported("init-capture without an initializer")),
                },
                CaptureKind::Unknown => {
                    return Err(SynthesisError::UnknownCapture {
                        name: capture.name.clone(),
                        location: lambda.location.clone(),
                    }
                    .into())
                }
            };
            ctor_args.push(arg);
        }

        let scope = self.current_scope();
        let name = self.namer.closure_name(lambda.id, scope)?;
        tracing::debug!(closure = %name, captures = lambda.captures.len(), "lambda");

        let layouts: Vec<CaptureLayout> = lambda
            .captures
            .iter()
            .map(|c| layout(c, |ty| self.namer.print_type(ty)))
            .collect();
        let mut rewrite = ClosureRewrite::default();
        for (capture, layout) in lambda.captures.iter().zip(&layouts) {
            match capture.kind {
                CaptureKind::This => rewrite.this_spelling = Some("__this".to_string()),
                CaptureKind::StarThis => rewrite.this_spelling = Some("(&__this)".to_string()),
                _ => {
                    if let Some(var) = capture.var {
                        rewrite.captures.insert(var, layout.member.clone());
                    }
                }
            }
        }

        let mut class = FragmentBuffer::new();
        class.line(format!("class {}", name));
        class.open_brace();
        class.line("public:");
        self.call_operators(lambda, &rewrite, &mut class)?;
        if lambda.captures.is_empty() && !lambda.is_generic() && !lambda.return_type.mentions_closure() {
            self.function_pointer_conversion(lambda, &name, &mut class)?;
        }

        if !layouts.is_empty() {
            class.blank();
            class.line("private:");
            let mut params = Vec::with_capacity(layouts.len());
            for layout in &layouts {
                let member = self.declarator(&layout.member_ty, &layout.member)?;
                class.line(format!("{};", member));
                params.push(self.declarator(&layout.param_ty, &format!("_{}", layout.member))?);
            }
            let inits: Vec<&str> = layouts.iter().map(|l| l.init.as_str()).collect();
            class.blank();
            class.line("public:");
            class.line(format!(
                "{}({}) : {} {{}}",
                name,
                params.join(", "),
                inits.join(", ")
            ));
        }
        class.close_brace(";");
        self.hoist(class);

        Ok(format!("{}{{{}}}", name, ctor_args.join(", ")))
    }

    /// One call operator, or one per distinct parameter-type tuple of a
    /// generic lambda.
    fn call_operators(
        &mut self,
        lambda: &LambdaExpr,
        rewrite: &ClosureRewrite,
        class: &mut FragmentBuffer,
    ) -> Result<()> {
        let constness = if lambda.is_mutable { "" } else { " const" };
        match &lambda.generic {
            None => {
                let params: Vec<(CppType, String)> = lambda
                    .params
                    .iter()
                    .map(|p| (p.ty.clone(), p.name.clone()))
                    .collect();
                self.call_operator(&lambda.return_type, &params, &lambda.body, constness, rewrite, class)
            }
            Some(specializations) => {
                let mut seen = FxHashSet::default();
                let mut emitted = 0;
                for spec in specializations {
                    let tuple: Vec<String> = spec
                        .param_types
                        .iter()
                        .map(|t| self.namer.print_type(t))
                        .collect();
                    if !seen.insert(tuple.join(", ")) {
                        continue;
                    }
                    let params: Vec<(CppType, String)> = spec
                        .param_types
                        .iter()
                        .enumerate()
                        .map(|(i, ty)| {
                            let name = lambda
                                .params
                                .get(i)
                                .map(|p| p.name.clone())
                                .unwrap_or_else(|| format!("__arg{}", i));
                            (ty.clone(), name)
                        })
                        .collect();
                    if emitted > 0 {
                        class.blank();
                    }
                    self.call_operator(&spec.return_type, &params, &spec.body, constness, rewrite, class)?;
                    emitted += 1;
                }
                Ok(())
            }
        }
    }

    fn call_operator(
        &mut self,
        return_type: &CppType,
        params: &[(CppType, String)],
        body: &Stmt,
        constness: &str,
        rewrite: &ClosureRewrite,
        class: &mut FragmentBuffer,
    ) -> Result<()> {
        let consteval = self.in_consteval_context();
        // The body stays in the enclosing scope, so closures nested in it
        // are numbered after this one.
        let scope = self.current_scope();
        let key = self.namer.scope_name(scope);
        self.enter_function(&key, consteval, Some(rewrite.clone()));
        let mut rendered = Vec::with_capacity(params.len());
        for (ty, param) in params {
            rendered.push(self.declarator(ty, param)?);
        }
        let ret = if return_type.mentions_closure() {
            "auto".to_string()
        } else {
            self.type_name(return_type)?
        };
        class.line(format!("inline {} operator()({}){}", ret, rendered.join(", "), constness));
        self.function_body(body, class)?;
        self.leave_function();
        Ok(())
    }

    /// Conversion to a plain function pointer, forwarding to a static invoker.
    fn function_pointer_conversion(&mut self, lambda: &LambdaExpr, name: &str, class: &mut FragmentBuffer) -> Result<()> {
        let fptr = CppType::Function {
            return_type: Box::new(lambda.return_type.clone()),
            params: lambda.params.iter().map(|p| p.ty.clone()).collect(),
            is_variadic: false,
            is_noexcept: false,
        }
        .ptr();
        let fptr = self.type_name(&fptr)?;
        let ret = self.type_name(&lambda.return_type)?;

        let mut params = Vec::with_capacity(lambda.params.len());
        let mut forwarded = Vec::with_capacity(lambda.params.len());
        for (i, param) in lambda.params.iter().enumerate() {
            let pname = if param.name.is_empty() {
                format!("__arg{}", i)
            } else {
                param.name.clone()
            };
            params.push(self.declarator(&param.ty, &pname)?);
            if param.ty.is_rvalue_reference() {
                let target = self.type_name(&param.ty)?;
                forwarded.push(format!("static_cast<{}>({})", target, pname));
            } else {
                forwarded.push(pname);
            }
        }

        class.blank();
        class.line(format!("using __fptr_t = {};", fptr));
        class.line("inline operator __fptr_t () const noexcept");
        class.open_brace();
        class.line("return __invoke;");
        class.close_brace("");
        class.blank();
        class.line("private:");
        class.line(format!("static inline {} __invoke({})", ret, params.join(", ")));
        class.open_brace();
        class.line(format!("return {}{{}}.operator()({});", name, forwarded.join(", ")));
        class.close_brace("");
        Ok(())
    }
}
