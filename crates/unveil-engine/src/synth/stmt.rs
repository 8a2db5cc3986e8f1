//! Statements.
//!
//! Every statement is synthesized inside its own prelude, so closure classes
//! and lifetime-extended temporaries created while printing it land directly
//! in front of it. Branches and loop bodies always get braces.

use crate::consteval::{evaluation_context, takes_then_branch};
use crate::context::{Context, LocalVar};
use crate::emit::FragmentBuffer;
use crate::error::Result;
use std::slice;
use unveil_tree::{DeclKind, Expr, ExprKind, IfKind, IfStmt, Stmt};

impl<'c, 'u> Context<'c, 'u> {
    /// `{ stmts }`, closing with lifetime markers for the block's locals.
    pub(crate) fn block(&mut self, stmts: &[Stmt], out: &mut FragmentBuffer) -> Result<()> {
        out.open_brace();
        self.push_lifetime_scope();
        for stmt in stmts {
            self.stmt(stmt, out)?;
        }
        let locals = self.pop_lifetime_scope();
        self.lifetime_markers(&locals, out)?;
        out.close_brace("");
        Ok(())
    }

    pub(crate) fn function_body(&mut self, body: &Stmt, out: &mut FragmentBuffer) -> Result<()> {
        match body {
            Stmt::Compound(stmts) => self.block(stmts, out),
            other => self.block(slice::from_ref(other), out),
        }
    }

    /// Lifetime ends in reverse order of construction.
    pub(crate) fn lifetime_markers(&mut self, locals: &[LocalVar], out: &mut FragmentBuffer) -> Result<()> {
        if !self.options.show_lifetime {
            return Ok(());
        }
        for local in locals.iter().rev() {
            if local.ty.is_reference() {
                continue;
            }
            let note = self.destruction_note(&local.name, &local.ty)?;
            out.line(note);
        }
        Ok(())
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt, out: &mut FragmentBuffer) -> Result<()> {
        match stmt {
            Stmt::Compound(stmts) => self.block(stmts, out),
            Stmt::Decl(decls) => {
                for decl in decls {
                    self.synth_decl(decl, out)?;
                }
                Ok(())
            }
            Stmt::Expr(e) => {
                let (prelude, text) = self.with_prelude(|cx| cx.expr(e))?;
                out.append(prelude);
                out.line(format!("{};", text));
                Ok(())
            }
            Stmt::Return { value: None, .. } => {
                out.line("return;");
                Ok(())
            }
            Stmt::Return {
                value: Some(value),
                nrvo,
            } => {
                let (prelude, text) = self.with_prelude(|cx| cx.return_value(value, *nrvo))?;
                out.append(prelude);
                out.line(format!("return {};", text));
                Ok(())
            }
            Stmt::If(if_stmt) => self.if_stmt(if_stmt, out),
            Stmt::While { cond, body } => {
                let (prelude, cond) = self.with_prelude(|cx| cx.expr(cond))?;
                out.append(prelude);
                out.line(format!("while({})", cond));
                self.branch(body, out)
            }
            Stmt::DoWhile { body, cond } => {
                let (prelude, cond) = self.with_prelude(|cx| cx.expr(cond))?;
                out.append(prelude);
                out.line("do");
                out.open_brace();
                self.push_lifetime_scope();
                match body.as_ref() {
                    Stmt::Compound(stmts) => {
                        for stmt in stmts {
                            self.stmt(stmt, out)?;
                        }
                    }
                    other => self.stmt(other, out)?,
                }
                let locals = self.pop_lifetime_scope();
                self.lifetime_markers(&locals, out)?;
                out.close_brace(&format!(" while({});", cond));
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                inc,
                body,
            } => self.for_stmt(init.as_deref(), cond.as_ref(), inc.as_ref(), body, out),
            Stmt::RangeFor(range_for) => self.range_for(range_for, out),
            Stmt::Break => {
                out.line("break;");
                Ok(())
            }
            Stmt::Continue => {
                out.line("continue;");
                Ok(())
            }
            Stmt::Null => {
                out.line(";");
                Ok(())
            }
            Stmt::Unsupported { kind } => Err(self.unsupported(kind.clone())),
        }
    }

    /// A branch or loop body, braced even when written without braces.
    pub(crate) fn branch(&mut self, body: &Stmt, out: &mut FragmentBuffer) -> Result<()> {
        self.function_body(body, out)
    }

    /// The returned object. Under NRVO the copy into the return slot never
    /// happens, so the construction wrapping the variable is dropped.
    fn return_value(&mut self, value: &Expr, nrvo: bool) -> Result<String> {
        if nrvo {
            if let ExprKind::Construct { args, .. } = &value.ignore_implicit().kind {
                if let [only] = args.as_slice() {
                    return self.expr(only);
                }
            }
        }
        self.expr(value)
    }

    fn if_stmt(&mut self, s: &IfStmt, out: &mut FragmentBuffer) -> Result<()> {
        let Some(init) = &s.init else {
            return self.if_body(s, out);
        };
        out.open_brace();
        self.push_lifetime_scope();
        self.stmt(init, out)?;
        self.if_body(s, out)?;
        let locals = self.pop_lifetime_scope();
        self.lifetime_markers(&locals, out)?;
        out.close_brace("");
        Ok(())
    }

    fn if_body(&mut self, s: &IfStmt, out: &mut FragmentBuffer) -> Result<()> {
        let head = match s.kind {
            IfKind::Consteval { negated } if self.options.standard.has_cxx20() => {
                return self.if_consteval(s, negated, out);
            }
            IfKind::Consteval { negated } => {
                if negated {
                    "if !consteval".to_string()
                } else {
                    "if consteval".to_string()
                }
            }
            IfKind::Normal | IfKind::Constexpr => {
                let Some(cond) = &s.cond else {
                    return Err(self.unsupported("if without a condition"));
                };
                let (prelude, cond) = self.with_prelude(|cx| cx.expr(cond))?;
                out.append(prelude);
                if s.kind == IfKind::Constexpr {
                    format!("if constexpr({})", cond)
                } else {
                    format!("if({})", cond)
                }
            }
        };
        out.line(head);
        self.branch(&s.then, out)?;
        if let Some(else_) = &s.else_ {
            out.line("else");
            self.branch(else_, out)?;
        }
        Ok(())
    }

    /// Keep only the branch the evaluation context selects.
    fn if_consteval(&mut self, s: &IfStmt, negated: bool, out: &mut FragmentBuffer) -> Result<()> {
        let compile_time = self.in_consteval_context();
        out.line(format!(
            "// if consteval: {} branch selected",
            evaluation_context(compile_time)
        ));
        let selected = if takes_then_branch(negated, compile_time) {
            Some(&s.then)
        } else {
            s.else_.as_ref()
        };
        match selected {
            Some(branch) => self.branch(branch, out),
            None => Ok(()),
        }
    }

    fn for_stmt(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        inc: Option<&Expr>,
        body: &Stmt,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        self.push_lifetime_scope();
        let inline_init = match init {
            None | Some(Stmt::Null) => Some(None),
            Some(Stmt::Expr(e)) => Some(Some(Stmt::Expr(e.clone()))),
            Some(Stmt::Decl(decls)) if decls.len() == 1 && matches!(decls[0].kind, DeclKind::Var(_)) => {
                Some(Some(Stmt::Decl(decls.clone())))
            }
            Some(_) => None,
        };
        let wrapped = inline_init.is_none();
        if wrapped {
            out.open_brace();
            if let Some(init) = init {
                self.stmt(init, out)?;
            }
        }

        let (prelude, header) = self.with_prelude(|cx| {
            let init_text = match inline_init.as_ref().and_then(Option::as_ref) {
                Some(Stmt::Expr(e)) => cx.expr(e)?,
                Some(Stmt::Decl(decls)) => match &decls[0].kind {
                    DeclKind::Var(var) => cx.var_text(&decls[0], var, &decls[0].name)?,
                    _ => String::new(),
                },
                _ => String::new(),
            };
            let cond_text = match cond {
                Some(c) => cx.expr(c)?,
                None => String::new(),
            };
            let inc_text = match inc {
                Some(i) => cx.expr(i)?,
                None => String::new(),
            };
            Ok(format!("for({}; {}; {})", init_text, cond_text, inc_text))
        })?;
        out.append(prelude);
        out.line(header);
        self.branch(body, out)?;

        let locals = self.pop_lifetime_scope();
        self.lifetime_markers(&locals, out)?;
        if wrapped {
            out.close_brace("");
        }
        Ok(())
    }
}
