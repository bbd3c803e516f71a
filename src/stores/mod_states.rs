//! Mod enable/disable states, owned by the mods manager

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Enable lookup for catalog candidates
pub trait ModStates: Sync {
    /// Whether the mod with this id may be listed; unknown ids are enabled
    fn is_enabled(&self, id: &str) -> bool;
}

/// Every mod enabled
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEnabled;

impl ModStates for AllEnabled {
    fn is_enabled(&self, _id: &str) -> bool {
        true
    }
}

impl ModStates for HashMap<String, bool> {
    fn is_enabled(&self, id: &str) -> bool {
        self.get(id).copied().unwrap_or(true)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModStatesFile {
    #[serde(default)]
    mod_states: HashMap<String, bool>,
}

/// States read from `mod_states.json`
#[derive(Debug, Clone, Default)]
pub struct JsonModStates {
    states: HashMap<String, bool>,
}

impl JsonModStates {
    /// Read the states file; a missing file enables everything
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mod states {:?}", path))?;
        let file: ModStatesFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mod states {:?}", path))?;

        Ok(Self {
            states: file.mod_states,
        })
    }
}

impl ModStates for JsonModStates {
    fn is_enabled(&self, id: &str) -> bool {
        self.states.is_enabled(id)
    }
}
