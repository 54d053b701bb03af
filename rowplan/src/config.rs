//! Workflow configuration.
//!
//! The configuration document exists to parametrize external stage
//! backends; its per-stage schema is the backends' concern. The core
//! only routes the right subtree to the right stage and never
//! interprets its contents.

use crate::errors::ConfigError;
use crate::stages::StageName;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// An opaque per-stage configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowConfig {
    sections: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowConfig {
    /// Loads a configuration document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed,
    /// or when the document root is not a JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        Self::from_value(value)
    }

    /// Builds a configuration from an in-memory JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAnObject`] when `value` is not an
    /// object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        match value {
            serde_json::Value::Object(sections) => Ok(Self { sections }),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Returns the configuration subtree for a stage, if present.
    #[must_use]
    pub fn section(&self, stage: StageName) -> Option<&serde_json::Value> {
        self.sections.get(stage.as_str())
    }

    /// Returns true when no sections are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
