//! Language standard selector.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// C++ language standard the input was compiled as. Desugaring rules that
/// depend on a newer standard are inactive below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LanguageStandard {
    Cxx11,
    Cxx14,
    #[default]
    Cxx17,
    Cxx20,
    Cxx23,
}

impl LanguageStandard {
    pub fn spelling(self) -> &'static str {
        match self {
            LanguageStandard::Cxx11 => "c++11",
            LanguageStandard::Cxx14 => "c++14",
            LanguageStandard::Cxx17 => "c++17",
            LanguageStandard::Cxx20 => "c++20",
            LanguageStandard::Cxx23 => "c++23",
        }
    }

    /// Structured bindings and separate begin/end in range-for.
    pub fn has_cxx17(self) -> bool {
        self >= LanguageStandard::Cxx17
    }

    /// consteval, `if consteval` rendering and range-for init statements.
    pub fn has_cxx20(self) -> bool {
        self >= LanguageStandard::Cxx20
    }
}

impl FromStr for LanguageStandard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let version = lower
            .strip_prefix("-std=")
            .unwrap_or(&lower)
            .trim_start_matches("c++")
            .trim_start_matches("gnu++");
        match version {
            "11" | "0x" => Ok(LanguageStandard::Cxx11),
            "14" | "1y" => Ok(LanguageStandard::Cxx14),
            "17" | "1z" => Ok(LanguageStandard::Cxx17),
            "20" | "2a" => Ok(LanguageStandard::Cxx20),
            "23" | "2b" => Ok(LanguageStandard::Cxx23),
            _ => Err(ConfigError::UnknownStandard(s.to_string())),
        }
    }
}

impl TryFrom<String> for LanguageStandard {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageStandard> for String {
    fn from(value: LanguageStandard) -> Self {
        value.spelling().to_string()
    }
}

impl fmt::Display for LanguageStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}
