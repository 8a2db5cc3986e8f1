//! Configuration types (unveil.toml format).

use crate::standard::LanguageStandard;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnveilConfig {
    /// Which desugarings are shown and how.
    #[serde(default)]
    pub transform: TransformOptions,

    /// Output formatting.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Options that change what the engine renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Standard the input was compiled as (e.g., "c++17", "c++20").
    pub standard: LanguageStandard,

    /// Render every implicit conversion, including lvalue-to-rvalue and decays.
    pub show_all_implicit_casts: bool,

    /// Bind class-type template arguments to named template parameter objects.
    pub use_template_syntax_for_nttp: bool,

    /// Mark where each local's lifetime ends and which destructor runs.
    pub show_lifetime: bool,
}

/// Output formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Spaces per nesting level.
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

fn default_indent_width() -> usize {
    2
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
        }
    }
}

impl UnveilConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: UnveilConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.output.indent_width == 0 || self.output.indent_width > 16 {
            return Err(crate::ConfigError::Validation(format!(
                "output.indent_width must be between 1 and 16, got {}",
                self.output.indent_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = UnveilConfig::from_toml("").expect("Failed to parse config");
        assert_eq!(config.transform.standard, LanguageStandard::Cxx17);
        assert!(!config.transform.show_all_implicit_casts);
        assert!(!config.transform.use_template_syntax_for_nttp);
        assert!(!config.transform.show_lifetime);
        assert_eq!(config.output.indent_width, 2);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[transform]
standard = "c++20"
show_all_implicit_casts = true
use_template_syntax_for_nttp = true
show_lifetime = true

[output]
indent_width = 4
        "#;

        let config = UnveilConfig::from_toml(toml).expect("Failed to parse config");
        assert_eq!(config.transform.standard, LanguageStandard::Cxx20);
        assert!(config.transform.show_all_implicit_casts);
        assert!(config.transform.use_template_syntax_for_nttp);
        assert!(config.transform.show_lifetime);
        assert_eq!(config.output.indent_width, 4);
    }

    #[test]
    fn test_unknown_standard_is_rejected() {
        let err = UnveilConfig::from_toml("[transform]\nstandard = \"c++03\"\n").unwrap_err();
        assert!(err.to_string().contains("c++03"));
    }

    #[test]
    fn test_indent_width_is_validated() {
        let err = UnveilConfig::from_toml("[output]\nindent_width = 0\n").unwrap_err();
        assert!(matches!(err, crate::ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[transform]\nstandard = \"gnu++23\"").expect("write config");

        let config = UnveilConfig::from_file(file.path()).expect("Failed to load config");
        assert_eq!(config.transform.standard, LanguageStandard::Cxx23);
    }
}
