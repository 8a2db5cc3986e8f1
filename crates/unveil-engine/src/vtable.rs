//! Virtual dispatch model.
//!
//! A class's table is its first base's slots followed by the slots other
//! bases add, each overridden where the class declares a method with the
//! same name and signature, then the class's new virtual methods. The
//! destructor occupies a slot like any other virtual method. Virtual
//! inheritance is not modeled: virtual bases are laid out like ordinary ones.

use crate::context::Context;
use crate::error::{Result, SynthesisError};
use std::rc::Rc;
use unveil_tree::{CppType, Dispatch, FunctionDecl, FunctionKind, MemberState, RecordDecl};

const DTOR_SLOT: &str = "~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VSlot {
    /// Method name, or `~` for the destructor.
    pub method: String,
    pub signature: String,
    /// Class whose definition fills the slot.
    pub implementor: String,
    pub is_pure: bool,
}

impl VSlot {
    /// `Derived::speak`, `Derived::~Derived`.
    pub fn target(&self) -> String {
        if self.method == DTOR_SLOT {
            let simple = unveil_tree::last_component(&self.implementor);
            let simple = simple.split('<').next().unwrap_or(simple);
            format!("{}::~{}", self.implementor, simple)
        } else {
            format!("{}::{}", self.implementor, self.method)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VTable {
    pub class: String,
    pub slots: Vec<VSlot>,
}

impl VTable {
    pub fn slot_of(&self, method: &str) -> Option<usize> {
        let method = if method.starts_with('~') { DTOR_SLOT } else { method };
        self.slots.iter().position(|s| s.method == method)
    }

    /// One-line listing used ahead of a polymorphic class definition.
    pub fn describe(&self) -> String {
        let slots: Vec<String> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let pure = if slot.is_pure { " (pure)" } else { "" };
                format!("[{}] {}{}", i, slot.target(), pure)
            })
            .collect();
        format!("/* vtable for {}: {} */", self.class, slots.join(", "))
    }
}

/// Where a virtual call lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    pub static_class: String,
    pub slot: usize,
    pub target: String,
}

impl ResolvedCall {
    pub fn comment(&self) -> String {
        format!(
            "/* vtable dispatch: {} slot {} -> {} */",
            self.static_class, self.slot, self.target
        )
    }
}

impl<'c, 'u> Context<'c, 'u> {
    /// The vtable of `class`, or `None` when it is unknown or not polymorphic.
    pub(crate) fn vtable(&mut self, class: &str) -> Result<Option<Rc<VTable>>> {
        let class = class.trim_start_matches("::");
        if let Some(cached) = self.vtables.get(class) {
            return Ok(cached.clone());
        }
        let tree = self.tree();
        let table = match tree.record(class) {
            Some(info) => {
                let table = self.build_vtable(class, info.record)?;
                (!table.slots.is_empty()).then(|| Rc::new(table))
            }
            None => None,
        };
        self.vtables.insert(class.to_string(), table.clone());
        Ok(table)
    }

    /// The vtable of a class type, including class template specializations.
    pub(crate) fn vtable_for_type(&mut self, ty: &CppType) -> Result<Option<Rc<VTable>>> {
        let name = self.namer.print_type(ty.decayed());
        if let Some(cached) = self.vtables.get(&name) {
            return Ok(cached.clone());
        }
        let tree = self.tree();
        let table = match tree.record_for_type(ty) {
            Some((_, record)) => {
                let table = self.build_vtable(&name, record)?;
                (!table.slots.is_empty()).then(|| Rc::new(table))
            }
            None => None,
        };
        self.vtables.insert(name, table.clone());
        Ok(table)
    }

    fn build_vtable(&mut self, class: &str, record: &RecordDecl) -> Result<VTable> {
        let mut slots: Vec<VSlot> = Vec::new();
        for base in &record.bases {
            if let Some(base_table) = self.vtable_for_type(&base.ty)? {
                for slot in &base_table.slots {
                    if !slots
                        .iter()
                        .any(|s| s.method == slot.method && s.signature == slot.signature)
                    {
                        slots.push(slot.clone());
                    }
                }
            }
        }

        for (decl, func) in record.methods() {
            let (method, signature) = if func.kind == FunctionKind::Destructor {
                (DTOR_SLOT.to_string(), String::new())
            } else {
                (decl.name.clone(), self.signature(func))
            };
            match slots
                .iter_mut()
                .find(|s| s.method == method && s.signature == signature)
            {
                Some(slot) => {
                    slot.implementor = class.to_string();
                    slot.is_pure = func.specifiers.is_pure;
                }
                None if func.specifiers.is_virtual => slots.push(VSlot {
                    method,
                    signature,
                    implementor: class.to_string(),
                    is_pure: func.specifiers.is_pure,
                }),
                None => {}
            }
        }

        // An implicitly declared destructor still overrides the inherited slot.
        let dtor_state = record.special_members.dtor.state;
        let declares_dtor = record
            .methods()
            .any(|(_, f)| f.kind == FunctionKind::Destructor);
        if !declares_dtor && dtor_state != MemberState::NotDeclared {
            if let Some(slot) = slots.iter_mut().find(|s| s.method == DTOR_SLOT) {
                slot.implementor = class.to_string();
                slot.is_pure = false;
            }
        }

        tracing::trace!(class, slots = slots.len(), "vtable built");
        Ok(VTable {
            class: class.to_string(),
            slots,
        })
    }

    fn signature(&self, func: &FunctionDecl) -> String {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| self.namer.print_type(&p.ty))
            .collect();
        let constness = if func.specifiers.is_const { " const" } else { "" };
        format!("({}){}", params.join(", "), constness)
    }

    /// Whether `derived` is `base` or inherits from it, directly or not.
    pub(crate) fn derives_from(&self, derived: &str, base: &str) -> bool {
        let derived = derived.trim_start_matches("::");
        let base = base.trim_start_matches("::");
        if derived == base {
            return true;
        }
        let tree = self.tree();
        let Some(info) = tree.record(derived) else {
            return false;
        };
        info.record.bases.iter().any(|b| {
            let name = self.namer.print_type(b.ty.decayed());
            self.derives_from(&name, base)
        })
    }

    /// Resolve a virtual call of `method` through `dispatch.static_class`.
    pub(crate) fn resolve_dispatch(&mut self, dispatch: &Dispatch, method: &str) -> Result<ResolvedCall> {
        let static_class = dispatch.static_class.trim_start_matches("::").to_string();
        let missing = || SynthesisError::MissingVirtual {
            class: static_class.clone(),
            method: method.to_string(),
        };
        let static_table = self.vtable(&static_class)?.ok_or_else(missing)?;
        let slot = static_table.slot_of(method).ok_or_else(missing)?;

        let dynamic_class = dispatch
            .dynamic_class
            .as_deref()
            .map(|c| c.trim_start_matches("::").to_string())
            .unwrap_or_else(|| static_class.clone());
        if !self.derives_from(&dynamic_class, &static_class) {
            return Err(SynthesisError::UnrelatedDispatch {
                method: method.to_string(),
                static_class,
                dynamic_class,
            }
            .into());
        }

        let static_slot = &static_table.slots[slot];
        let target = match self.vtable(&dynamic_class)? {
            Some(table) => table
                .slots
                .iter()
                .find(|s| s.method == static_slot.method && s.signature == static_slot.signature)
                .map(VSlot::target)
                .unwrap_or_else(|| static_slot.target()),
            None => static_slot.target(),
        };
        Ok(ResolvedCall {
            static_class,
            slot,
            target,
        })
    }
}
