//! Structured bindings.
//!
//! `auto& [a, b] = pt;` becomes a hidden variable bound like the declaration
//! (`Point & __pt_0 = pt;`) followed by one named reference per binding into
//! that variable, or one `get<i>` call per element for tuple-like types.

use super::special::array_elements;
use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::{Result, SynthesisError};
use unveil_tree::{BindingAccess, CppType, DecompositionDecl, TupleGetter};

fn extents(ty: &CppType) -> Vec<u64> {
    let mut extents = Vec::new();
    let mut current = ty.decayed();
    while let CppType::Array { element, size } = current {
        extents.push(size.unwrap_or(0));
        current = element.unqualified();
    }
    extents
}

/// `auto`, `auto &`, `const auto` ... matching how the hidden variable is bound.
fn written_specifier(ty: &CppType) -> &'static str {
    match ty {
        CppType::Reference {
            is_rvalue: false,
            referent,
        } if referent.is_const() => "const auto &",
        CppType::Reference { is_rvalue: false, .. } => "auto &",
        CppType::Reference { is_rvalue: true, .. } => "auto &&",
        other if other.is_const() => "const auto",
        _ => "auto",
    }
}

impl<'c, 'u> Context<'c, 'u> {
    pub(crate) fn synth_decomposition(&mut self, d: &DecompositionDecl, out: &mut FragmentBuffer) -> Result<()> {
        if !self.options.standard.has_cxx17() {
            let (prelude, init) = self.with_prelude(|cx| cx.expr(&d.init))?;
            out.append(prelude);
            for binding in &d.bindings {
                self.reserve_local(&binding.name, binding.id)?;
            }
            let names: Vec<&str> = d.bindings.iter().map(|b| b.name.as_str()).collect();
            out.line(format!("{} [{}] = {};", written_specifier(&d.ty), names.join(", "), init));
            return Ok(());
        }
        let (prelude, lines) = self.with_prelude(|cx| cx.decomposition_lines(d, None))?;
        out.append(prelude);
        for line in lines {
            out.line(line);
        }
        Ok(())
    }

    /// The hidden variable and the bindings, one declaration per line. A
    /// range-for passes the loop element as `init`.
    pub(crate) fn decomposition_lines(&mut self, d: &DecompositionDecl, init: Option<String>) -> Result<Vec<String>> {
        let hint = d.init.as_variable_name().unwrap_or("aggr").to_string();
        let from_element = init.is_some();
        let init = match init {
            Some(text) => text,
            None => self.expr(&d.init)?,
        };
        let hidden = self.fresh_local(&hint)?;
        tracing::trace!(hidden = %hidden, bindings = d.bindings.len(), "structured binding");

        let mut lines = Vec::with_capacity(d.bindings.len() + 1);
        let declarator = self.declarator(&d.ty, &hidden)?;
        if d.ty.is_array() && !d.ty.is_reference() && !from_element {
            let elements = array_elements(&init, &extents(&d.ty), &|e: String| e);
            lines.push(format!("{} = {};", declarator, elements));
        } else {
            lines.push(format!("{} = {};", declarator, init));
        }
        self.track_local(&hidden, &d.ty);

        let hidden_const = d.ty.non_reference().is_const();
        for binding in &d.bindings {
            self.reserve_local(&binding.name, binding.id)?;
            let line = match &binding.access {
                BindingAccess::Field(member) => {
                    let declarator = self.binding_declarator(&binding.ty, hidden_const, &binding.name)?;
                    format!("{} = {}.{};", declarator, hidden, member)
                }
                BindingAccess::Element(index) => {
                    let declarator = self.binding_declarator(&binding.ty, hidden_const, &binding.name)?;
                    format!("{} = {}[{}];", declarator, hidden, index)
                }
                BindingAccess::Tuple { index, getter } => {
                    let Some(getter) = getter else {
                        return Err(SynthesisError::MissingTupleAccessor {
                            binding: binding.name.clone(),
                            index: *index,
                        }
                        .into());
                    };
                    let lvalue = d.ty.is_lvalue_reference();
                    let ty = match &binding.ty {
                        ty if ty.is_reference() => ty.clone(),
                        ty if lvalue => ty.clone().ref_(),
                        ty => ty.clone().rvalue_ref(),
                    };
                    let arg = if lvalue {
                        hidden.clone()
                    } else {
                        let target = self.type_name(&d.ty.non_reference().clone().rvalue_ref())?;
                        format!("static_cast<{}>({})", target, hidden)
                    };
                    let call = match getter {
                        TupleGetter::Member => format!("{}.get<{}>()", arg, index),
                        TupleGetter::Free(function) => format!("{}<{}>({})", function, index, arg),
                    };
                    format!("{} = {};", self.declarator(&ty, &binding.name)?, call)
                }
            };
            lines.push(line);
        }
        Ok(lines)
    }

    /// A reference to the bound element, const when the hidden variable is.
    fn binding_declarator(&mut self, ty: &CppType, hidden_const: bool, name: &str) -> Result<String> {
        let bound = if ty.is_reference() {
            ty.clone()
        } else if hidden_const && !ty.is_const() {
            ty.clone().const_().ref_()
        } else {
            ty.clone().ref_()
        };
        self.declarator(&bound, name)
    }
}
