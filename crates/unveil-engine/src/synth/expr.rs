//! Expression rendering.

use crate::consteval::{annotate, render_literal};
use crate::context::Context;
use crate::error::Result;
use unveil_tree::{CastStyle, ConstValue, DeclId, Dispatch, Expr, ExprKind, TemplateUse, ValueCategory};

/// Whether `e` must be parenthesized before a postfix operator is applied.
pub(crate) fn needs_parens(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Binary { .. } | ExprKind::Conditional { .. } | ExprKind::ConstantExpr { .. } => true,
        ExprKind::Unary { op, .. } => !op.is_postfix(),
        ExprKind::ExplicitCast {
            style: CastStyle::CStyle,
            ..
        } => true,
        ExprKind::ImplicitCast { operand, .. } | ExprKind::MaterializeTemporary { operand, .. } => {
            needs_parens(operand)
        }
        _ => false,
    }
}

pub(crate) fn postfix_operand(e: &Expr, text: String) -> String {
    if needs_parens(e) {
        format!("({})", text)
    } else {
        text
    }
}

/// Whether writing `op` directly before `operand` would lex as a different
/// token, as in `-` followed by `-x` or `-5`.
fn tokens_merge(op: &str, operand: &str) -> bool {
    match (op.chars().last(), operand.chars().next()) {
        (Some(last), Some(first)) => last == first && matches!(first, '+' | '-' | '&'),
        _ => false,
    }
}

/// The string literal a user-defined literal was written with, if any.
fn string_literal(e: &Expr) -> Option<&str> {
    match &e.kind {
        ExprKind::Literal(ConstValue::Str(s)) => Some(s),
        ExprKind::ImplicitCast { operand, .. } | ExprKind::Paren(operand) => string_literal(operand),
        _ => None,
    }
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn expr(&mut self, e: &Expr) -> Result<String> {
        match &e.kind {
            ExprKind::Literal(value) => Ok(render_literal(value, &e.ty, &self.namer)),
            ExprKind::NameRef {
                name,
                decl,
                template,
            } => self.name_ref(name, *decl, template.as_ref()),
            ExprKind::Call { callee, args } => {
                let callee_text = self.expr(callee)?;
                let args = self.args(args)?;
                Ok(format!("{}({})", postfix_operand(callee, callee_text), args))
            }
            ExprKind::MemberCall {
                object,
                arrow,
                method,
                template,
                args,
                dispatch,
            } => self.member_call(object, *arrow, method, template.as_ref(), args, dispatch.as_ref()),
            ExprKind::Member {
                object,
                arrow,
                member,
            } => {
                let object_text = self.expr(object)?;
                let sep = if *arrow { "->" } else { "." };
                Ok(format!("{}{}{}", postfix_operand(object, object_text), sep, member))
            }
            ExprKind::OperatorCall { op, member, args } => self.operator_call(op, *member, args),
            ExprKind::UserLiteral { suffix, literal } => {
                let text = self.expr(literal)?;
                match string_literal(literal) {
                    Some(s) => Ok(format!(
                        "operator\"\"{}({}, {}UL)",
                        suffix,
                        text,
                        s.chars().count()
                    )),
                    None => Ok(format!("operator\"\"{}({})", suffix, text)),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                if *op == unveil_tree::BinaryOp::Comma {
                    Ok(format!("{}, {}", l, r))
                } else {
                    Ok(format!("{} {} {}", l, op.spelling(), r))
                }
            }
            ExprKind::Unary { op, operand } => {
                let text = self.expr(operand)?;
                if op.is_postfix() {
                    Ok(format!("{}{}", postfix_operand(operand, text), op.spelling()))
                } else if matches!(operand.kind, ExprKind::Binary { .. } | ExprKind::Conditional { .. })
                    || tokens_merge(op.spelling(), &text)
                {
                    Ok(format!("{}({})", op.spelling(), text))
                } else {
                    Ok(format!("{}{}", op.spelling(), text))
                }
            }
            ExprKind::Paren(inner) => Ok(format!("({})", self.expr(inner)?)),
            ExprKind::Conditional { cond, then, else_ } => {
                let c = self.expr(cond)?;
                let t = self.expr(then)?;
                let f = self.expr(else_)?;
                Ok(format!("{} ? {} : {}", c, t, f))
            }
            ExprKind::ImplicitCast {
                kind,
                operand,
                conversion,
            } => self.implicit_cast(e, *kind, operand, conversion.as_deref()),
            ExprKind::ExplicitCast { style, operand } => self.explicit_cast(e, *style, operand),
            ExprKind::MaterializeTemporary { operand, extended } => {
                self.materialize(e, operand, *extended)
            }
            ExprKind::Construct { args, list_init, .. } => {
                let ty = self.type_name(&e.ty)?;
                let args = self.args(args)?;
                if *list_init {
                    Ok(format!("{}{{{}}}", ty, args))
                } else {
                    Ok(format!("{}({})", ty, args))
                }
            }
            ExprKind::Lambda(lambda) => self.synth_lambda(lambda),
            ExprKind::InitList(items) => Ok(format!("{{{}}}", self.args(items)?)),
            ExprKind::StdInitializerList(items) => {
                let ty = self.type_name(&e.ty)?;
                Ok(format!("{}{{{}}}", ty, self.args(items)?))
            }
            ExprKind::This => Ok(self.this_spelling()),
            ExprKind::ConstantExpr { value, operand } => {
                let value_text = render_literal(value, &e.ty, &self.namer);
                let original = self.expr(operand)?;
                Ok(annotate(&value_text, &original))
            }
            ExprKind::ArraySubscript { base, index } => {
                let base_text = self.expr(base)?;
                let index_text = self.expr(index)?;
                Ok(format!("{}[{}]", postfix_operand(base, base_text), index_text))
            }
            ExprKind::Unsupported { kind } => Err(self.unsupported(kind.clone())),
        }
    }

    pub(crate) fn args(&mut self, args: &[Expr]) -> Result<String> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.expr(arg)?);
        }
        Ok(rendered.join(", "))
    }

    /// A name, rewritten to the closure member inside a call operator that
    /// captured it.
    pub(crate) fn name_ref(&mut self, name: &str, decl: Option<DeclId>, template: Option<&TemplateUse>) -> Result<String> {
        if let (Some(decl), Some(rewrite)) = (decl, self.closure_rewrite()) {
            if let Some(member) = rewrite.captures.get(&decl) {
                return Ok(format!("this->{}", member));
            }
        }
        if let Some(access) = decl.and_then(|d| self.static_locals.get(&d)) {
            return Ok(access.clone());
        }
        match template {
            Some(used) => self.template_name(name, used),
            None => Ok(name.to_string()),
        }
    }

    pub(crate) fn this_spelling(&self) -> String {
        self.closure_rewrite()
            .and_then(|r| r.this_spelling.clone())
            .unwrap_or_else(|| "this".to_string())
    }

    fn member_call(
        &mut self,
        object: &Expr,
        arrow: bool,
        method: &str,
        template: Option<&TemplateUse>,
        args: &[Expr],
        dispatch: Option<&Dispatch>,
    ) -> Result<String> {
        let object_text = self.expr(object)?;
        let method_text = match template {
            Some(used) => self.template_name(method, used)?,
            None => method.to_string(),
        };
        let args = self.args(args)?;
        let sep = if arrow { "->" } else { "." };
        let call = format!(
            "{}{}{}({})",
            postfix_operand(object, object_text),
            sep,
            method_text,
            args
        );
        match dispatch {
            Some(dispatch) => {
                let resolved = self.resolve_dispatch(dispatch, method)?;
                tracing::trace!(method, target = %resolved.target, "virtual call");
                Ok(format!("{} {}", call, resolved.comment()))
            }
            None => Ok(call),
        }
    }

    fn operator_call(&mut self, op: &str, member: bool, args: &[Expr]) -> Result<String> {
        if member {
            let Some((object, rest)) = args.split_first() else {
                return Err(self.unsupported(format!("operator{} without an object", op)));
            };
            let object_text = self.expr(object)?;
            let rest = self.args(rest)?;
            Ok(format!("{}.operator{}({})", postfix_operand(object, object_text), op, rest))
        } else {
            Ok(format!("operator{}({})", op, self.args(args)?))
        }
    }

    fn explicit_cast(&mut self, e: &Expr, style: CastStyle, operand: &Expr) -> Result<String> {
        let inner = self.expr(operand)?;
        let keyword = match style {
            CastStyle::CStyle => {
                let target = self.category_type(e)?;
                return Ok(format!("({}){}", target, postfix_operand(operand, inner)));
            }
            CastStyle::Functional => {
                let target = self.type_name(&e.ty)?;
                return Ok(format!("{}({})", target, inner));
            }
            CastStyle::Static => "static_cast",
            CastStyle::Const => "const_cast",
            CastStyle::Reinterpret => "reinterpret_cast",
            CastStyle::Dynamic => "dynamic_cast",
        };
        let target = self.category_type(e)?;
        Ok(format!("{}<{}>({})", keyword, target, inner))
    }

    /// The type an expression has as a cast target: `T &` for lvalues,
    /// `T &&` for xvalues.
    pub(crate) fn category_type(&mut self, e: &Expr) -> Result<String> {
        let ty = match e.category {
            _ if e.ty.is_reference() => e.ty.clone(),
            ValueCategory::LValue => e.ty.clone().ref_(),
            ValueCategory::XValue => e.ty.clone().rvalue_ref(),
            ValueCategory::PRValue => e.ty.clone(),
        };
        self.type_name(&ty)
    }
}
