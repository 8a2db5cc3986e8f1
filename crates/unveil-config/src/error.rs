//! Error types for unveil-config.

use thiserror::Error;

/// Result type for unveil-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Unknown `-std=` spelling.
    #[error("Unknown language standard `{0}` (expected c++11, c++14, c++17, c++20 or c++23)")]
    UnknownStandard(String),

    /// Configuration validation error.
    #[error("Config validation error: {0}")]
    Validation(String),
}
