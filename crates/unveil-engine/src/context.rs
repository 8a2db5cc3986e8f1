//! Per-run transformation state.
//!
//! One `Context` lives for one run over one unit. It owns the namer, the
//! instantiation registry and the caches the synthesizers share, plus the
//! stacks that track where synthesis currently is: the emission unit being
//! built, the function being printed, and the statement whose prelude
//! collects hoisted definitions.

use crate::emit::FragmentBuffer;
use crate::error::{DesugarError, Result};
use crate::namer::{ArgStyle, Namer, NameOwner, ScopeId};
use crate::registry::{InstantiationKey, InstantiationRegistry, PendingUse};
use crate::synth::special::EffectiveMembers;
use crate::vtable::VTable;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use unveil_common::{Diagnostic, SourceLocation};
use unveil_config::TransformOptions;
use unveil_tree::{ConstValue, CppType, DeclId, ResolvedTree, TemplateArg, TemplateUse};

/// State collected while one top-level declaration (or one instantiation)
/// is synthesized.
#[derive(Debug, Default)]
pub(crate) struct EmissionUnit {
    pub namespace: Vec<String>,
    pub discoveries: Vec<PendingUse>,
    seen: FxHashSet<InstantiationKey>,
    /// Namespace-level definitions hoisted in front of the unit.
    pub prelude: FragmentBuffer,
    /// Template parameter objects, which must precede any instantiation
    /// naming them.
    pub objects: FragmentBuffer,
    /// Template parameter objects bound while synthesizing this unit.
    pub nttp_literals: Vec<String>,
    depths: StackDepths,
}

#[derive(Debug, Default, Clone, Copy)]
struct StackDepths {
    functions: usize,
    preludes: usize,
    lifetimes: usize,
}

/// How names inside a closure's call operator are rewritten.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClosureRewrite {
    /// Captured variable -> data member.
    pub captures: FxHashMap<DeclId, String>,
    /// Spelling of `this` inside the call operator, when `this` was captured.
    pub this_spelling: Option<String>,
}

#[derive(Debug)]
pub(crate) struct FunctionFrame {
    pub scope: ScopeId,
    pub is_consteval: bool,
    pub closure: Option<ClosureRewrite>,
}

/// A local whose lifetime ends at the close of the enclosing block.
#[derive(Debug, Clone)]
pub(crate) struct LocalVar {
    pub name: String,
    pub ty: CppType,
}

pub struct Context<'c, 'u> {
    tree: &'c dyn ResolvedTree<'u>,
    pub(crate) options: TransformOptions,
    pub(crate) namer: Namer,
    pub(crate) registry: InstantiationRegistry,
    pub(crate) specials: FxHashMap<String, EffectiveMembers>,
    pub(crate) vtables: FxHashMap<String, Option<Rc<VTable>>>,
    /// Default member initializers as rendered in the class body.
    pub(crate) field_inits: FxHashMap<DeclId, String>,
    /// Local statics lowered to raw storage, and how to reach the object.
    pub(crate) static_locals: FxHashMap<DeclId, String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) location: SourceLocation,
    ns_path: Vec<String>,
    units: Vec<EmissionUnit>,
    preludes: Vec<FragmentBuffer>,
    functions: Vec<FunctionFrame>,
    lifetimes: Vec<Vec<LocalVar>>,
}

impl<'c, 'u> Context<'c, 'u> {
    pub fn new(tree: &'c dyn ResolvedTree<'u>, options: TransformOptions) -> Self {
        Self {
            tree,
            options,
            namer: Namer::new(),
            registry: InstantiationRegistry::new(),
            specials: FxHashMap::default(),
            vtables: FxHashMap::default(),
            field_inits: FxHashMap::default(),
            static_locals: FxHashMap::default(),
            diagnostics: Vec::new(),
            location: SourceLocation::default(),
            ns_path: Vec::new(),
            units: Vec::new(),
            preludes: Vec::new(),
            functions: Vec::new(),
            lifetimes: Vec::new(),
        }
    }

    pub(crate) fn tree(&self) -> &'c dyn ResolvedTree<'u> {
        self.tree
    }

    pub(crate) fn unsupported(&self, kind: impl Into<String>) -> DesugarError {
        DesugarError::unsupported(kind, self.location.clone())
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(diagnostic = %diagnostic.summary(), "declaration skipped");
        self.diagnostics.push(diagnostic);
    }

    // Namespaces

    pub(crate) fn enter_namespace(&mut self, name: &str) {
        self.ns_path.push(name.to_string());
    }

    pub(crate) fn leave_namespace(&mut self) {
        self.ns_path.pop();
    }

    pub(crate) fn namespace_path(&self) -> &[String] {
        &self.ns_path
    }

    // Emission units

    pub(crate) fn begin_unit(&mut self, namespace: Vec<String>) {
        let depths = StackDepths {
            functions: self.functions.len(),
            preludes: self.preludes.len(),
            lifetimes: self.lifetimes.len(),
        };
        self.units.push(EmissionUnit {
            namespace,
            depths,
            ..EmissionUnit::default()
        });
    }

    /// Close the current unit, unwinding whatever an aborted synthesis left
    /// on the stacks.
    pub(crate) fn end_unit(&mut self) -> EmissionUnit {
        let unit = self.units.pop().unwrap_or_default();
        self.functions.truncate(unit.depths.functions);
        self.preludes.truncate(unit.depths.preludes);
        self.lifetimes.truncate(unit.depths.lifetimes);
        unit
    }

    /// Forget template parameter objects bound by a unit whose output was
    /// discarded.
    pub(crate) fn rollback_unit(&mut self, unit: &EmissionUnit) {
        for literal in &unit.nttp_literals {
            self.namer.unbind_nttp_object(literal);
        }
    }

    // Scopes and functions

    pub(crate) fn enter_function(
        &mut self,
        key: &str,
        is_consteval: bool,
        closure: Option<ClosureRewrite>,
    ) -> ScopeId {
        let scope = self.namer.scope(key);
        self.functions.push(FunctionFrame {
            scope,
            is_consteval,
            closure,
        });
        scope
    }

    pub(crate) fn leave_function(&mut self) {
        self.functions.pop();
    }

    pub(crate) fn in_function(&self) -> bool {
        !self.functions.is_empty()
    }

    pub(crate) fn in_consteval_context(&self) -> bool {
        self.functions.last().map_or(false, |f| f.is_consteval)
    }

    pub(crate) fn closure_rewrite(&self) -> Option<&ClosureRewrite> {
        self.functions.last().and_then(|f| f.closure.as_ref())
    }

    pub(crate) fn current_scope(&mut self) -> ScopeId {
        match self.functions.last() {
            Some(frame) => frame.scope,
            None => {
                let key = format!("ns:{}", self.ns_path.join("::"));
                self.namer.scope(&key)
            }
        }
    }

    /// A fresh `__{hint}_{n}` in the current scope.
    pub(crate) fn fresh_local(&mut self, hint: &str) -> Result<String> {
        let scope = self.current_scope();
        self.namer.fresh_name(scope, hint)
    }

    /// Register a user-declared name in the current scope.
    pub(crate) fn reserve_local(&mut self, name: &str, decl: DeclId) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }
        let scope = self.current_scope();
        self.namer.reserve(scope, name, NameOwner::Decl(decl))
    }

    // Statement preludes

    /// Run `f` collecting every definition hoisted while it runs.
    pub(crate) fn with_prelude<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(FragmentBuffer, T)> {
        self.preludes.push(FragmentBuffer::new());
        let result = f(self);
        let prelude = self.preludes.pop().unwrap_or_default();
        result.map(|value| (prelude, value))
    }

    /// Place `fragments` before the statement being synthesized.
    pub(crate) fn hoist(&mut self, fragments: FragmentBuffer) {
        if let Some(prelude) = self.preludes.last_mut() {
            prelude.append(fragments);
        } else if let Some(unit) = self.units.last_mut() {
            unit.prelude.append(fragments);
        }
    }

    pub(crate) fn hoist_line(&mut self, line: String) {
        let mut buf = FragmentBuffer::new();
        buf.line(line);
        self.hoist(buf);
    }

    // Lifetimes

    pub(crate) fn push_lifetime_scope(&mut self) {
        self.lifetimes.push(Vec::new());
    }

    pub(crate) fn pop_lifetime_scope(&mut self) -> Vec<LocalVar> {
        self.lifetimes.pop().unwrap_or_default()
    }

    pub(crate) fn track_local(&mut self, name: &str, ty: &CppType) {
        if let Some(scope) = self.lifetimes.last_mut() {
            scope.push(LocalVar {
                name: name.to_string(),
                ty: ty.clone(),
            });
        }
    }

    // Types and template uses

    /// Print `ty`, recording the instantiations it mentions.
    pub(crate) fn type_name(&mut self, ty: &CppType) -> Result<String> {
        self.note_type(ty)?;
        Ok(self.namer.print_type(ty))
    }

    pub(crate) fn declarator(&mut self, ty: &CppType, name: &str) -> Result<String> {
        self.note_type(ty)?;
        Ok(self.namer.print_declarator(ty, name))
    }

    /// `name<args>` for a template use, recording the use.
    pub(crate) fn template_name(&mut self, name: &str, used: &TemplateUse) -> Result<String> {
        self.discover(used)?;
        Ok(self.namer.print_name(name, Some(&used.args)))
    }

    pub(crate) fn note_type(&mut self, ty: &CppType) -> Result<()> {
        match ty {
            CppType::Pointer(inner) | CppType::Const(inner) => self.note_type(inner),
            CppType::Reference { referent, .. } => self.note_type(referent),
            CppType::Array { element, .. } => self.note_type(element),
            CppType::Function {
                return_type,
                params,
                ..
            } => {
                self.note_type(return_type)?;
                for param in params {
                    self.note_type(param)?;
                }
                Ok(())
            }
            CppType::Instantiation { template, args } => {
                self.discover(&TemplateUse::new(template.clone(), args.clone()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn note_template_args(&mut self, args: &[TemplateArg]) -> Result<()> {
        for arg in args {
            match arg {
                TemplateArg::Type(ty) => self.note_type(ty)?,
                TemplateArg::Value(value) => self.note_value(value)?,
                TemplateArg::Pack(items) => self.note_template_args(items)?,
                TemplateArg::Template(_) => {}
            }
        }
        Ok(())
    }

    /// Record a use of a template specialization in the current unit.
    pub(crate) fn discover(&mut self, used: &TemplateUse) -> Result<()> {
        self.note_template_args(&used.args)?;
        let tree = self.tree();
        if tree.template(&used.template).is_none() {
            return Ok(());
        }
        let key = InstantiationKey::new(
            &used.template,
            &self.namer.canonical_template_args(&used.args),
        );
        if let Some(unit) = self.units.last_mut() {
            if unit.seen.insert(key.clone()) {
                tracing::trace!(key = %key, "template use");
                unit.discoveries.push(PendingUse {
                    key,
                    used: used.clone(),
                });
            }
        }
        Ok(())
    }

    /// Class-type template arguments become named template parameter objects
    /// when that option is on.
    fn note_value(&mut self, value: &ConstValue) -> Result<()> {
        let ConstValue::Aggregate { ty, .. } = value else {
            return Ok(());
        };
        self.note_type(ty)?;
        if !self.options.use_template_syntax_for_nttp || self.units.is_empty() {
            return Ok(());
        }
        let literal = crate::consteval::render_value(value, &self.namer, ArgStyle::Canonical);
        if self.namer.nttp_object(&literal).is_some() {
            return Ok(());
        }
        let scope = self.namer.scope("tu");
        let name = self.namer.fresh_name(scope, "nttp")?;
        let type_name = self.namer.print_type(ty);
        let init = literal
            .strip_prefix(type_name.as_str())
            .unwrap_or(literal.as_str())
            .to_string();
        self.namer.bind_nttp_object(literal.clone(), &name);
        if let Some(unit) = self.units.last_mut() {
            unit.objects
                .line(format!("inline constexpr {} {}{};", type_name, name, init));
            unit.nttp_literals.push(literal);
        }
        Ok(())
    }
}
