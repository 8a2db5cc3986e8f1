//! The translation unit handed over by the front end.

use crate::decl::Decl;
use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fully resolved translation unit: top-level declarations in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedUnit {
    /// Main file the unit was produced from.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

impl ResolvedUnit {
    pub fn new(decls: Vec<Decl>) -> Self {
        Self {
            source: None,
            decls,
        }
    }

    /// Parse a unit from the JSON produced by a front-end exporter.
    pub fn from_json(json: &str) -> Result<Self> {
        let unit: ResolvedUnit = serde_json::from_str(json)?;
        Ok(unit)
    }

    /// Load a unit from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TreeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
