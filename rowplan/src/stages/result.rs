//! Per-stage result type.

use crate::value::StageValue;
use serde::{Deserialize, Serialize};

/// The outcome of one attempted pipeline stage.
///
/// Replaces entry-present/entry-absent bundle semantics with an
/// explicit three-state tag carrying its reason, so a skipped stage is
/// distinguishable from a failed one without inspecting `null`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageResult {
    /// The stage ran and produced a value.
    Success {
        /// The backend's output value.
        value: StageValue,
    },
    /// The stage was not run, with the reason it was skipped.
    Skipped {
        /// Why the stage did not run.
        reason: String,
    },
    /// The stage's backend raised an error, captured here.
    Failed {
        /// The captured error message.
        error: String,
    },
}

impl StageResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn success(value: StageValue) -> Self {
        Self::Success { value }
    }

    /// Creates a skipped result with a reason.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Creates a failed result with a captured error message.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the output value for successful results.
    #[must_use]
    pub const fn value(&self) -> Option<&StageValue> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the skip reason for skipped results.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Self::Skipped { reason } => Some(reason),
            _ => None,
        }
    }

    /// Returns the captured error for failed results.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Returns the status tag as a string.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}
