//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle position of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// The single setUp stage, always first.
    SetUp,
    /// One of the plugin's execute stages, in declaration order.
    Execute,
    /// The single tearDown stage, always last.
    TearDown,
}

impl StageKind {
    /// Returns the canonical stage name for fixed stages.
    #[must_use]
    pub fn fixed_name(&self) -> Option<&'static str> {
        match self {
            Self::SetUp => Some("setUp"),
            Self::TearDown => Some("tearDown"),
            Self::Execute => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetUp => write!(f, "setup"),
            Self::Execute => write!(f, "execute"),
            Self::TearDown => write!(f, "teardown"),
        }
    }
}

/// The result status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed without error.
    Passed,
    /// Stage returned an error or panicked.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.pad("pass"),
            Self::Failed => f.pad("fail"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}
