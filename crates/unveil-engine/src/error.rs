//! Error types for the desugaring engine.

use miette::Diagnostic;
use thiserror::Error;
use unveil_common::SourceLocation;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, DesugarError>;

/// A desugaring rule's precondition does not hold for its input.
#[derive(Error, Debug, Diagnostic)]
pub enum SynthesisError {
    #[error("capture `{name}` of the lambda at {location} has a kind no closure layout exists for")]
    #[diagnostic(code(unveil::unknown_capture))]
    UnknownCapture {
        name: String,
        location: SourceLocation,
    },

    #[error("the {member} of `{class}` is reported as defaulted but must be deleted: {reason}")]
    #[diagnostic(
        code(unveil::ill_formed_deletion),
        help("the front end and the deletion rules disagree; no body is emitted for this class")
    )]
    IllFormedDeletion {
        class: String,
        member: &'static str,
        reason: String,
    },

    #[error("structured binding `{binding}` needs a tuple accessor for element {index}, but none was resolved")]
    #[diagnostic(code(unveil::missing_tuple_accessor))]
    MissingTupleAccessor { binding: String, index: u64 },

    #[error("virtual call to `{method}` through `{static_class}` on a `{dynamic_class}`, which does not derive from it")]
    #[diagnostic(code(unveil::unrelated_dispatch))]
    UnrelatedDispatch {
        method: String,
        static_class: String,
        dynamic_class: String,
    },

    #[error("`{class}` has no vtable slot for `{method}`")]
    #[diagnostic(code(unveil::missing_virtual))]
    MissingVirtual { class: String, method: String },
}

/// Errors raised while desugaring a unit.
///
/// `UnsupportedConstruct` and `Synthesis` abort only the declaration being
/// synthesized; `NamingConflict` aborts the whole run.
#[derive(Error, Debug, Diagnostic)]
pub enum DesugarError {
    #[error("unsupported construct `{kind}` at {location}")]
    #[diagnostic(
        code(unveil::unsupported_construct),
        help("no desugaring rule exists for this construct; the declaration is skipped")
    )]
    UnsupportedConstruct {
        kind: String,
        location: SourceLocation,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("naming conflict: `{name}` in scope `{scope}` is already bound to another entity")]
    #[diagnostic(code(unveil::naming_conflict))]
    NamingConflict { scope: String, name: String },
}

impl DesugarError {
    pub fn unsupported(kind: impl Into<String>, location: SourceLocation) -> Self {
        DesugarError::UnsupportedConstruct {
            kind: kind.into(),
            location,
        }
    }

    /// Whether the error ends the run rather than just the current declaration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DesugarError::NamingConflict { .. })
    }
}
