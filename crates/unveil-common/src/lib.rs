mod location;
mod symbol;
mod diagnostic;

pub use location::SourceLocation;
pub use symbol::{Symbol, SymbolInterner};
pub use diagnostic::{Diagnostic, DiagnosticLevel};
