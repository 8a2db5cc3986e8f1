//! Configuration for the unveil desugaring engine.
//!
//! This crate provides:
//! - Transformation options (which implicit constructs are rendered, and how)
//! - The language standard selector that gates standard-dependent rules
//! - Configuration file format (`unveil.toml`)
//!
//! # Example
//!
//! ```toml
//! # unveil.toml
//! [transform]
//! standard = "c++20"
//! show_all_implicit_casts = false
//! use_template_syntax_for_nttp = true
//! show_lifetime = true
//!
//! [output]
//! indent_width = 2
//! ```

mod config;
mod error;
mod standard;

pub use config::{OutputConfig, TransformOptions, UnveilConfig};
pub use error::{ConfigError, Result};
pub use standard::LanguageStandard;
