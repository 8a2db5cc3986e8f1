//! Range-based for loops as explicit iterator or index loops.

use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::Result;
use unveil_tree::{DeclKind, RangeForStmt, RangeIteration, Stmt};

/// The part of a full declarator `T * name` that declares a second variable
/// of the same type in one declaration: `* name`.
fn trailing_declarator(full: &str, name: &str) -> String {
    let prefix = full.strip_suffix(name).unwrap_or(full);
    let base = prefix.trim_end_matches(|c: char| c == '*' || c == '&' || c == ' ');
    full[base.len()..].trim_start().to_string()
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn range_for(&mut self, rf: &RangeForStmt, out: &mut FragmentBuffer) -> Result<()> {
        out.open_brace();
        self.push_lifetime_scope();
        if let Some(init) = &rf.init {
            self.stmt(init, out)?;
        }

        let (prelude, range_text) = self.with_prelude(|cx| cx.expr(&rf.range))?;
        out.append(prelude);
        let range = self.fresh_local("range")?;
        let range_decl = self.declarator(&rf.range_ty, &range)?;
        out.line(format!("{} = {};", range_decl, range_text));
        self.track_local(&range, &rf.range_ty);

        match &rf.iteration {
            RangeIteration::Array { size } => {
                let index = self.fresh_local("index")?;
                out.line(format!(
                    "for(unsigned long {i} = 0; {i} < {size}; ++{i})",
                    i = index,
                    size = size
                ));
                self.range_for_body(rf, format!("{}[{}]", range, index), out)?;
            }
            RangeIteration::Member { iterator } | RangeIteration::Free { iterator } => {
                let begin = self.fresh_local("begin")?;
                let end = self.fresh_local("end")?;
                let (begin_init, end_init) = match &rf.iteration {
                    RangeIteration::Member { .. } => (format!("{}.begin()", range), format!("{}.end()", range)),
                    _ => (format!("begin({})", range), format!("end({})", range)),
                };
                let begin_decl = self.declarator(iterator, &begin)?;
                let end_decl = self.declarator(iterator, &end)?;
                if self.options.standard.has_cxx17() {
                    out.line(format!("{} = {};", begin_decl, begin_init));
                    out.line(format!("{} = {};", end_decl, end_init));
                    out.line(format!("for(; {b} != {e}; ++{b})", b = begin, e = end));
                } else {
                    out.line(format!(
                        "for({} = {}, {} = {}; {b} != {e}; ++{b})",
                        begin_decl,
                        begin_init,
                        trailing_declarator(&end_decl, &end),
                        end_init,
                        b = begin,
                        e = end
                    ));
                }
                self.track_local(&begin, iterator);
                self.track_local(&end, iterator);
                self.range_for_body(rf, format!("*{}", begin), out)?;
            }
        }

        let locals = self.pop_lifetime_scope();
        self.lifetime_markers(&locals, out)?;
        out.close_brace("");
        Ok(())
    }

    /// The loop body, opening with the loop variable bound to `element`.
    fn range_for_body(&mut self, rf: &RangeForStmt, element: String, out: &mut FragmentBuffer) -> Result<()> {
        out.open_brace();
        self.push_lifetime_scope();
        match &rf.var.kind {
            DeclKind::Var(var) => {
                self.reserve_local(&rf.var.name, rf.var.id)?;
                let declarator = self.declarator(&var.ty, &rf.var.name)?;
                out.line(format!("{} = {};", declarator, element));
                self.track_local(&rf.var.name, &var.ty);
            }
            DeclKind::Decomposition(decomposition) => {
                for line in self.decomposition_lines(decomposition, Some(element))? {
                    out.line(line);
                }
            }
            _ => return Err(self.unsupported(format!("range-for over a {}", rf.var.kind_name()))),
        }
        match &rf.body {
            Stmt::Compound(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt, out)?;
                }
            }
            other => self.stmt(other, out)?,
        }
        let locals = self.pop_lifetime_scope();
        self.lifetime_markers(&locals, out)?;
        out.close_brace("");
        Ok(())
    }
}
