//! Transformation driver.
//!
//! One pass over the top-level declarations in source order. Each
//! declaration is synthesized in its own emission unit; the instantiations it
//! uses are resolved and placed in front of it, followed by whatever it
//! hoisted, followed by the declaration itself.

use crate::context::Context;
use crate::emit::{Emitter, FragmentBuffer};
use crate::error::Result;
use crate::instantiate::PlacedInstantiation;
use crate::registry::InstantiationKey;
use unveil_common::Diagnostic;
use unveil_config::{TransformOptions, UnveilConfig};
use unveil_tree::{Decl, DeclKind, ResolvedTree, ResolvedUnit, UnitAdapter};

/// Result of one run.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    /// The desugared translation unit.
    pub text: String,
    /// Declarations and instantiations that could not be desugared.
    pub diagnostics: Vec<Diagnostic>,
    /// Instantiation keys in emission order, user specializations included.
    pub instantiations: Vec<String>,
}

impl TransformOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs the desugaring rules over resolved units.
#[derive(Debug, Clone)]
pub struct Transformer {
    options: TransformOptions,
    indent_width: usize,
}

impl Transformer {
    pub fn new(config: UnveilConfig) -> Self {
        Self {
            options: config.transform,
            indent_width: config.output.indent_width,
        }
    }

    pub fn with_options(options: TransformOptions) -> Self {
        Self::new(UnveilConfig {
            transform: options,
            ..UnveilConfig::default()
        })
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Desugar `unit`. Fails only on a naming conflict; every other failure
    /// is confined to its declaration and reported in the output.
    #[tracing::instrument(level = "debug", skip_all, fields(source = unit.source.as_deref().unwrap_or("<memory>")))]
    pub fn run(&self, unit: &ResolvedUnit) -> Result<TransformOutput> {
        let adapter = UnitAdapter::new(unit);
        self.run_tree(&adapter)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_tree<'u>(&self, tree: &dyn ResolvedTree<'u>) -> Result<TransformOutput> {
        let mut cx = Context::new(tree, self.options.clone());
        for info in tree.explicit_specializations() {
            let args = cx.namer.canonical_template_args(&info.spec.args);
            cx.registry
                .preregister(InstantiationKey::new(&info.spec.template, &args));
        }

        let mut out = FragmentBuffer::new();
        self.emit_members(&mut cx, tree.top_level(), &mut out)?;

        let text = Emitter::new(self.indent_width).render(&out);
        let instantiations = cx.registry.emitted().map(ToString::to_string).collect();
        tracing::debug!(
            bytes = text.len(),
            diagnostics = cx.diagnostics.len(),
            "transform complete"
        );
        Ok(TransformOutput {
            text,
            diagnostics: cx.diagnostics,
            instantiations,
        })
    }

    fn emit_members(&self, cx: &mut Context<'_, '_>, decls: &[Decl], out: &mut FragmentBuffer) -> Result<()> {
        for decl in decls {
            match &decl.kind {
                DeclKind::Namespace(ns) => {
                    let keyword = if ns.is_inline { "inline namespace" } else { "namespace" };
                    out.line(namespace_head(keyword, &decl.name));
                    out.open_brace();
                    cx.enter_namespace(&decl.name);
                    let result = self.emit_members(cx, &ns.members, out);
                    cx.leave_namespace();
                    result?;
                    out.close_brace(&namespace_tail(&decl.name));
                    out.blank();
                }
                _ => self.emit_decl(cx, decl, out)?,
            }
        }
        Ok(())
    }

    fn emit_decl(&self, cx: &mut Context<'_, '_>, decl: &Decl, out: &mut FragmentBuffer) -> Result<()> {
        cx.begin_unit(cx.namespace_path().to_vec());
        let mut body = FragmentBuffer::new();
        let result = cx.synth_decl(decl, &mut body);
        let unit = cx.end_unit();

        match result {
            Ok(()) => {
                let resolved = cx.resolve_instantiations(unit.discoveries)?;
                let current = cx.namespace_path().to_vec();
                let mut objects = unit.objects;
                objects.append(resolved.objects);
                at_global_scope(&current, objects, out);
                for placed in resolved.placed {
                    place(&current, placed, out);
                }
                out.append(unit.prelude);
                out.append(body);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                cx.rollback_unit(&unit);
                let subject = if decl.name.is_empty() {
                    decl.kind_name().to_string()
                } else {
                    decl.name.clone()
                };
                out.line(format!("// unveil: could not desugar `{}`: {}", subject, err));
                cx.report(
                    Diagnostic::error(err.to_string())
                        .with_location(decl.location.clone())
                        .with_subject(subject)
                        .with_help("the declaration is left out of the output"),
                );
            }
        }
        out.blank();
        Ok(())
    }
}

fn namespace_head(keyword: &str, name: &str) -> String {
    if name.is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", keyword, name)
    }
}

fn namespace_tail(name: &str) -> String {
    if name.is_empty() {
        " // namespace".to_string()
    } else {
        format!(" // namespace {}", name)
    }
}

/// Emit template parameter objects at global scope, where unqualified
/// lookup finds them from any namespace an instantiation is placed in.
fn at_global_scope(current: &[String], objects: FragmentBuffer, out: &mut FragmentBuffer) {
    if objects.is_empty() {
        return;
    }
    for name in current.iter().rev() {
        out.close_brace(&namespace_tail(name));
    }
    out.append(objects);
    for name in current {
        out.line(namespace_head("namespace", name));
        out.open_brace();
    }
}

/// Emit an instantiation in the innermost namespace enclosing both the
/// current position and its template, leaving and re-entering namespaces as
/// needed.
fn place(current: &[String], placed: PlacedInstantiation, out: &mut FragmentBuffer) {
    let common = current
        .iter()
        .zip(&placed.namespace)
        .take_while(|(a, b)| a == b)
        .count();
    for name in current[common..].iter().rev() {
        out.close_brace(&namespace_tail(name));
    }
    for name in &placed.namespace[common..] {
        out.line(namespace_head("namespace", name));
        out.open_brace();
    }
    tracing::trace!(key = %placed.key, level = common, "placing instantiation");
    out.append(placed.body);
    for name in placed.namespace[common..].iter().rev() {
        out.close_brace(&namespace_tail(name));
    }
    for name in &current[common..] {
        out.line(namespace_head("namespace", name));
        out.open_brace();
    }
    out.blank();
}
