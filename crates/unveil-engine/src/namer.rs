//! Type printing and name allocation.
//!
//! Every synthesized identifier comes from `fresh_name`, which counts per
//! scope and per hint in traversal order, so two runs over the same unit
//! produce the same names. User names are registered with `reserve` so that a
//! synthesized name never silently captures a user entity.

use crate::consteval::render_value;
use crate::error::{DesugarError, Result};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use unveil_common::{Symbol, SymbolInterner};
use unveil_tree::{CppType, DeclId, LambdaId, TemplateArg};

pub type ScopeId = Symbol;

/// Who a reserved name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameOwner {
    Decl(DeclId),
    Synthesized(u32),
}

/// How class-type template argument values are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// Literal values; used for instantiation keys.
    Canonical,
    /// Template parameter objects by name when one is bound.
    Display,
}

#[derive(Debug, Default)]
pub struct Namer {
    scopes: SymbolInterner,
    counters: FxHashMap<(ScopeId, SmolStr), u32>,
    taken: FxHashMap<(ScopeId, SmolStr), NameOwner>,
    closures: FxHashMap<LambdaId, SmolStr>,
    /// Canonical literal of a class-type value -> template parameter object.
    nttp_objects: FxHashMap<String, SmolStr>,
    next_synthesized: u32,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&mut self, key: &str) -> ScopeId {
        self.scopes.intern(key)
    }

    pub fn scope_name(&self, scope: ScopeId) -> String {
        self.scopes
            .resolve(scope)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Register `name` in `scope` for `owner`.
    ///
    /// User declarations may shadow one another; a clash involving a
    /// synthesized name is a conflict.
    pub fn reserve(&mut self, scope: ScopeId, name: &str, owner: NameOwner) -> Result<()> {
        let key = (scope, SmolStr::new(name));
        match self.taken.get(&key) {
            None => {
                self.taken.insert(key, owner);
                Ok(())
            }
            Some(existing) if *existing == owner => Ok(()),
            Some(NameOwner::Decl(_)) if matches!(owner, NameOwner::Decl(_)) => {
                self.taken.insert(key, owner);
                Ok(())
            }
            Some(_) => Err(DesugarError::NamingConflict {
                scope: self.scope_name(scope),
                name: name.to_string(),
            }),
        }
    }

    /// A new `__{hint}_{n}` unique within `scope`.
    pub fn fresh_name(&mut self, scope: ScopeId, hint: &str) -> Result<String> {
        let counter_key = (scope, SmolStr::new(hint));
        let mut n = self.counters.get(&counter_key).copied().unwrap_or(0);
        loop {
            let candidate = format!("__{}_{}", hint, n);
            n += 1;
            if self.taken.contains_key(&(scope, SmolStr::new(&candidate))) {
                continue;
            }
            self.counters.insert(counter_key, n);
            let owner = NameOwner::Synthesized(self.next_synthesized);
            self.next_synthesized += 1;
            self.reserve(scope, &candidate, owner)?;
            tracing::trace!(scope = %self.scope_name(scope), name = %candidate, "fresh name");
            return Ok(candidate);
        }
    }

    /// The closure class name for a lambda, allocated on first request.
    pub fn closure_name(&mut self, lambda: LambdaId, scope: ScopeId) -> Result<String> {
        if let Some(name) = self.closures.get(&lambda) {
            return Ok(name.to_string());
        }
        let name = self.fresh_name(scope, "closure")?;
        self.closures.insert(lambda, SmolStr::new(&name));
        Ok(name)
    }

    pub fn bind_nttp_object(&mut self, literal: String, name: &str) {
        self.nttp_objects.insert(literal, SmolStr::new(name));
    }

    pub fn unbind_nttp_object(&mut self, literal: &str) {
        self.nttp_objects.remove(literal);
    }

    pub fn nttp_object(&self, literal: &str) -> Option<&str> {
        self.nttp_objects.get(literal).map(SmolStr::as_str)
    }

    pub fn print_type(&self, ty: &CppType) -> String {
        self.compose(ty, String::new(), ArgStyle::Display)
    }

    /// `ty` declaring `name`, e.g. `int (*fp)(int)`.
    pub fn print_declarator(&self, ty: &CppType, name: &str) -> String {
        self.compose(ty, name.to_string(), ArgStyle::Display)
    }

    pub fn print_type_styled(&self, ty: &CppType, style: ArgStyle) -> String {
        self.compose(ty, String::new(), style)
    }

    /// `name` followed by its template argument list, if any.
    pub fn print_name(&self, name: &str, args: Option<&[TemplateArg]>) -> String {
        self.print_name_styled(name, args, ArgStyle::Display)
    }

    pub fn print_name_styled(&self, name: &str, args: Option<&[TemplateArg]>, style: ArgStyle) -> String {
        match args {
            Some(args) => format!("{}<{}>", name, self.print_template_args_styled(args, style)),
            None => name.to_string(),
        }
    }

    pub fn print_template_args(&self, args: &[TemplateArg]) -> String {
        self.print_template_args_styled(args, ArgStyle::Display)
    }

    /// The argument list as used in instantiation keys.
    pub fn canonical_template_args(&self, args: &[TemplateArg]) -> String {
        self.print_template_args_styled(args, ArgStyle::Canonical)
    }

    fn print_template_args_styled(&self, args: &[TemplateArg], style: ArgStyle) -> String {
        args.iter()
            .map(|arg| self.print_template_arg(arg, style))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn print_template_arg(&self, arg: &TemplateArg, style: ArgStyle) -> String {
        match arg {
            TemplateArg::Type(ty) => self.compose(ty, String::new(), style),
            TemplateArg::Value(value) => {
                let literal = render_value(value, self, ArgStyle::Canonical);
                if style == ArgStyle::Display && value.is_class_value() {
                    if let Some(object) = self.nttp_object(&literal) {
                        return object.to_string();
                    }
                }
                literal
            }
            TemplateArg::Pack(items) => self.print_template_args_styled(items, style),
            TemplateArg::Template(name) => name.clone(),
        }
    }

    fn compose(&self, ty: &CppType, decl: String, style: ArgStyle) -> String {
        match ty {
            CppType::Pointer(pointee) => {
                let decl = wrap_operator("*", decl, is_compound(pointee));
                self.compose(pointee, decl, style)
            }
            CppType::Reference {
                referent,
                is_rvalue,
            } => {
                let op = if *is_rvalue { "&&" } else { "&" };
                let decl = wrap_operator(op, decl, is_compound(referent));
                self.compose(referent, decl, style)
            }
            CppType::Array { element, size } => {
                let inner = parenthesize(decl);
                let bound = size.map(|n| n.to_string()).unwrap_or_default();
                self.compose(element, format!("{}[{}]", inner, bound), style)
            }
            CppType::Function {
                return_type,
                params,
                is_variadic,
                is_noexcept,
            } => {
                let inner = parenthesize(decl);
                let mut params: Vec<String> = params
                    .iter()
                    .map(|p| self.compose(p, String::new(), style))
                    .collect();
                if *is_variadic {
                    params.push("...".to_string());
                }
                let noexcept = if *is_noexcept { " noexcept" } else { "" };
                self.compose(
                    return_type,
                    format!("{}({}){}", inner, params.join(", "), noexcept),
                    style,
                )
            }
            CppType::Const(inner) => match inner.as_ref() {
                CppType::Pointer(_) => {
                    let decl = if decl.is_empty() {
                        "const".to_string()
                    } else {
                        format!("const {}", decl)
                    };
                    self.compose(inner, decl, style)
                }
                CppType::Array { element, size } => {
                    let moved = CppType::Array {
                        element: Box::new(element.as_ref().clone().const_()),
                        size: *size,
                    };
                    self.compose(&moved, decl, style)
                }
                CppType::Function { .. } | CppType::Reference { .. } => {
                    self.compose(inner, decl, style)
                }
                other => join(&format!("const {}", self.base_name(other, style)), &decl),
            },
            other => join(&self.base_name(other, style), &decl),
        }
    }

    fn base_name(&self, ty: &CppType, style: ArgStyle) -> String {
        match ty {
            CppType::Void => "void".to_string(),
            CppType::Bool => "bool".to_string(),
            CppType::Char => "char".to_string(),
            CppType::Short { signed } => unsigned_prefix(*signed, "short"),
            CppType::Int { signed } => unsigned_prefix(*signed, "int"),
            CppType::Long { signed } => unsigned_prefix(*signed, "long"),
            CppType::LongLong { signed } => unsigned_prefix(*signed, "long long"),
            CppType::Float => "float".to_string(),
            CppType::Double => "double".to_string(),
            CppType::LongDouble => "long double".to_string(),
            CppType::NullPtr => "std::nullptr_t".to_string(),
            CppType::Named(name) => name.clone(),
            CppType::Instantiation { template, args } => {
                self.print_name_styled(template, Some(args), style)
            }
            CppType::Closure(id) => self
                .closures
                .get(id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "auto".to_string()),
            compound => self.compose(compound, String::new(), style),
        }
    }
}

fn unsigned_prefix(signed: bool, base: &str) -> String {
    if signed {
        base.to_string()
    } else {
        format!("unsigned {}", base)
    }
}

/// Arrays and functions need the declarator parenthesized.
fn is_compound(ty: &CppType) -> bool {
    matches!(ty.unqualified(), CppType::Array { .. } | CppType::Function { .. })
}

fn wrap_operator(op: &str, decl: String, tight: bool) -> String {
    if decl.is_empty() {
        op.to_string()
    } else if tight || decl.starts_with('*') || decl.starts_with('&') {
        format!("{}{}", op, decl)
    } else {
        format!("{} {}", op, decl)
    }
}

fn parenthesize(decl: String) -> String {
    if decl.starts_with('*') || decl.starts_with('&') {
        format!("({})", decl)
    } else {
        decl
    }
}

fn join(base: &str, decl: &str) -> String {
    if decl.is_empty() {
        base.to_string()
    } else if decl.starts_with('[') {
        format!("{}{}", base, decl)
    } else {
        format!("{} {}", base, decl)
    }
}
