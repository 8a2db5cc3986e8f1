//! Implicit conversions and materialized temporaries.

use super::expr::postfix_operand;
use crate::context::Context;
use crate::error::Result;
use unveil_tree::{CastKind, Expr, ExprKind, ValueCategory};

/// Conversions worth showing even when not every implicit cast is requested.
pub(crate) fn is_interesting(kind: CastKind) -> bool {
    !matches!(
        kind,
        CastKind::LValueToRValue
            | CastKind::NoOp
            | CastKind::ArrayToPointerDecay
            | CastKind::FunctionToPointerDecay
            | CastKind::ToVoid
    )
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn implicit_cast(
        &mut self,
        e: &Expr,
        kind: CastKind,
        operand: &Expr,
        conversion: Option<&str>,
    ) -> Result<String> {
        let inner = self.expr(operand)?;
        let implicit_move = kind == CastKind::NoOp && e.category == ValueCategory::XValue;
        if !(self.options.show_all_implicit_casts || is_interesting(kind) || implicit_move) {
            return Ok(inner);
        }
        match kind {
            CastKind::UserDefinedConversion => {
                if let Some(function) = conversion {
                    return Ok(format!("{}.{}()", postfix_operand(operand, inner), function));
                }
            }
            CastKind::ConstructorConversion => {
                if matches!(operand.ignore_implicit().kind, ExprKind::Construct { .. }) {
                    return Ok(inner);
                }
                let target = self.type_name(&e.ty)?;
                return Ok(format!("{}({})", target, inner));
            }
            _ => {}
        }
        let target = self.category_type(e)?;
        Ok(format!("static_cast<{}>({})", target, inner))
    }

    /// A prvalue turned into an object. Lifetime-extended temporaries get a
    /// name of their own ahead of the statement; the others are spelled as a
    /// reference cast.
    pub(crate) fn materialize(&mut self, e: &Expr, operand: &Expr, extended: bool) -> Result<String> {
        let inner = self.expr(operand)?;
        let value_ty = e.ty.non_reference().clone();
        if extended {
            let name = self.fresh_local("temporary")?;
            let declarator = self.declarator(&value_ty, &name)?;
            self.hoist_line(format!("{} = {};", declarator, inner));
            self.track_local(&name, &value_ty);
            if e.category == ValueCategory::XValue {
                let target = self.type_name(&value_ty.rvalue_ref())?;
                return Ok(format!("static_cast<{}>({})", target, name));
            }
            return Ok(name);
        }
        if e.category == ValueCategory::PRValue {
            return Ok(inner);
        }
        let target = self.category_type(e)?;
        Ok(format!("static_cast<{}>({})", target, inner))
    }
}
