//! C++ desugaring engine.
//!
//! Takes a resolved translation unit and produces equivalent C++ source with
//! the compiler's implicit work written out:
//! - Implicit special members with their initialization and destruction order
//! - Lambdas as closure classes
//! - Structured bindings and range-based for loops as plain declarations and loops
//! - Implicit conversions, materialized temporaries and NRVO
//! - Template instantiations as explicit specializations, placed before first use
//! - Constant-evaluated values, `static_assert` results and `if consteval` selection
//! - Virtual dispatch targets
//!
//! # Example
//!
//! ```no_run
//! use unveil_engine::Transformer;
//! use unveil_config::UnveilConfig;
//! use unveil_tree::ResolvedUnit;
//!
//! let unit = ResolvedUnit::from_file(std::path::Path::new("main.unit.json"))?;
//! let output = Transformer::new(UnveilConfig::default()).run(&unit)?;
//! print!("{}", output.text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod consteval;
mod context;
mod driver;
mod emit;
mod error;
mod instantiate;
mod namer;
mod registry;
mod synth;
mod vtable;

pub use driver::{TransformOutput, Transformer};
pub use emit::{Emitter, Fragment, FragmentBuffer};
pub use error::{DesugarError, Result, SynthesisError};
pub use namer::{ArgStyle, Namer, NameOwner, ScopeId};
pub use registry::{InstantiationKey, InstantiationRegistry, PendingUse};
