//! Error types for the rowplan workflow core.
//!
//! Stage-level failures and dependency skips are deliberately not
//! represented here: they are absorbed into the result bundle as
//! [`crate::stages::StageResult`] variants and never propagate as
//! errors. The types below cover the two places where the core itself
//! can fail: loading input data and writing output artifacts.

use thiserror::Error;

/// Error raised while loading or validating corridor data.
///
/// Any variant of this error is fatal for the run: the workflow never
/// starts without a valid corridor.
#[derive(Debug, Error)]
pub enum DataError {
    /// The corridor source path does not exist.
    #[error("corridor file not found: {0}")]
    Missing(String),

    /// The parsed dataset contains zero segments.
    #[error("corridor data is empty")]
    Empty,

    /// The source could not be parsed as a corridor dataset.
    #[error("failed to parse corridor data: {0}")]
    Parse(String),

    /// The source could not be read.
    #[error("failed to read corridor data: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised while loading a workflow configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration document is not a JSON object.
    #[error("configuration root must be a JSON object")]
    NotAnObject,
}

/// Error raised while writing a single output artifact.
///
/// Export errors are collected per artifact and reported; one failed
/// artifact never blocks the others.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The artifact value could not be serialized.
    #[error("failed to serialize artifact {artifact}: {source}")]
    Serialize {
        /// Name of the artifact being written.
        artifact: String,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The artifact could not be written to disk.
    #[error("failed to write artifact {artifact}: {source}")]
    Io {
        /// Name of the artifact being written.
        artifact: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Returns the name of the artifact this error refers to.
    #[must_use]
    pub fn artifact(&self) -> &str {
        match self {
            Self::Serialize { artifact, .. } | Self::Io { artifact, .. } => artifact,
        }
    }
}

/// The top-level error type surfaced at the workflow boundary.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Corridor loading or validation failed.
    #[error("{0}")]
    Data(#[from] DataError),

    /// Configuration loading failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An output artifact could not be written.
    #[error("{0}")]
    Export(#[from] ExportError),
}
