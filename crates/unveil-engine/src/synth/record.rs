//! Class definitions with their implicit members spelled out.

use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::Result;
use unveil_tree::{AccessSpecifier, CppType, Decl, DeclKind, ExprKind, FieldDecl, RecordDecl};

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn synth_record(
        &mut self,
        decl: &Decl,
        record: &RecordDecl,
        display: &str,
        specialization: bool,
        self_ty: &CppType,
        out: &mut FragmentBuffer,
    ) -> Result<()> {
        let keyword = record.tag.keyword();
        if !record.is_definition {
            if specialization {
                out.line("template<>");
            }
            out.line(format!("{} {};", keyword, display));
            return Ok(());
        }
        let class = display;
        tracing::debug!(class, members = record.members.len(), "class");

        if let Some(table) = self.vtable_for_type(self_ty)? {
            out.line(table.describe());
        }
        if specialization {
            out.line("template<>");
        }
        let mut head = format!("{} {}", keyword, display);
        if !record.bases.is_empty() {
            let mut bases = Vec::with_capacity(record.bases.len());
            for base in &record.bases {
                let virtual_ = if base.is_virtual { "virtual " } else { "" };
                bases.push(format!("{}{} {}", virtual_, base.access.spelling(), self.type_name(&base.ty)?));
            }
            head.push_str(&format!(" : {}", bases.join(", ")));
        }
        out.line(head);
        out.open_brace();

        let self_name = self.namer.print_type(self_ty);
        let mut access = record.tag.default_access();
        for member in &record.members {
            let member_access = member.access.unwrap_or(access);
            if member_access != access {
                out.line(format!("{}:", member_access.spelling()));
                access = member_access;
            }
            self.location = member.location.clone();
            match &member.kind {
                DeclKind::Field(field) => self.synth_field(member, field, out)?,
                DeclKind::Function(func) => {
                    self.synth_function(member, func, &member.name, false, out)?;
                }
                DeclKind::Record(nested) => {
                    let nested_ty = CppType::named(format!("{}::{}", self_name, member.name));
                    self.synth_record(member, nested, &member.name, false, &nested_ty, out)?;
                }
                _ => self.synth_decl(member, out)?,
            }
        }
        self.location = decl.location.clone();

        let specials = self.render_special_members(self_ty, record, display)?;
        if !specials.is_empty() {
            out.blank();
            if access != AccessSpecifier::Public && !record.is_aggregate {
                out.line("public:");
            }
            out.append(specials);
        }
        out.close_brace(";");
        Ok(())
    }

    fn synth_field(&mut self, decl: &Decl, field: &FieldDecl, out: &mut FragmentBuffer) -> Result<()> {
        let (prelude, text) = self.with_prelude(|cx| {
            // The initializer first: a lambda there names the closure type
            // the declarator prints.
            let init = match &field.default_init {
                Some(init) => {
                    let rendered = match &init.kind {
                        ExprKind::InitList(items) => format!("{{{}}}", cx.args(items)?),
                        _ => cx.expr(init)?,
                    };
                    cx.field_inits.insert(decl.id, rendered.clone());
                    Some((init, rendered))
                }
                None => None,
            };
            let mut text = String::new();
            if field.is_mutable {
                text.push_str("mutable ");
            }
            text.push_str(&cx.declarator(&field.ty, &decl.name)?);
            match init {
                Some((init, rendered)) if matches!(init.kind, ExprKind::InitList(_)) => text.push_str(&rendered),
                Some((_, rendered)) => text.push_str(&format!(" = {}", rendered)),
                None => {}
            }
            Ok(text)
        })?;
        out.append(prelude);
        out.line(format!("{};", text));
        Ok(())
    }
}
