//! Desugaring rules.
//!
//! Each rule is an `impl Context` block in its own module; rules call each
//! other through the context, which carries the namer, the registries and
//! the current emission unit.

mod binding;
mod cast;
mod closure;
mod decl;
mod expr;
mod range_for;
mod record;
pub(crate) mod special;
mod stmt;
