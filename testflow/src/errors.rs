//! Error types for the testflow engine.
//!
//! Process-level problems (launch failures and expected-outcome violations)
//! are plain values that stage bodies propagate with `?`. The stage runner
//! turns them into failed stage outcomes, so none of them ever reaches the
//! lifecycle orchestrator as an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::process::ProcessId;

/// The main error type for testflow operations.
#[derive(Debug, Error)]
pub enum TestflowError {
    /// A process could not be started.
    #[error("{0}")]
    Launch(#[from] LaunchError),

    /// One or more members of a process group violated their expected outcome.
    #[error("{0}")]
    Violation(#[from] GroupViolation),

    /// A plugin definition was rejected.
    #[error("{0}")]
    Validation(#[from] PluginValidationError),

    /// The engine configuration was invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A duration literal could not be parsed.
    #[error("{0}")]
    Duration(#[from] DurationParseError),

    /// A stage body reported a failure.
    #[error("Stage failure: {0}")]
    Stage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error raised by plugin code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TestflowError {
    /// Creates a stage failure with a message.
    #[must_use]
    pub fn stage(message: impl Into<String>) -> Self {
        Self::Stage(message.into())
    }

    /// Returns true if this error came from process supervision.
    #[must_use]
    pub fn is_process_error(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::Violation(_))
    }
}

impl From<serde_json::Error> for TestflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for engine operations.
pub type TestflowResult<T> = Result<T, TestflowError>;

/// Error raised when a process cannot be started.
#[derive(Debug, Clone, Error)]
#[error("Failed to launch {process} ({program}): {reason}")]
pub struct LaunchError {
    /// Identifier of the process that failed to start.
    pub process: String,
    /// The executable that was requested.
    pub program: String,
    /// Why the launch failed.
    pub reason: String,
}

impl LaunchError {
    /// Creates a new launch error.
    #[must_use]
    pub fn new(
        process: impl Into<String>,
        program: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            process: process.into(),
            program: program.into(),
            reason: reason.into(),
        }
    }
}

/// How a process broke its expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A clean-exit process was still running (or only finished) at the bound.
    Timeout {
        /// The time bound that was exceeded.
        #[serde(with = "duration_ms")]
        bound: Duration,
    },
    /// A never-completes process exited before the bound.
    PrematureExit {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Time from start to exit.
        #[serde(with = "duration_ms")]
        elapsed: Duration,
    },
    /// A clean-exit process exited with a nonzero code or a signal.
    UnexpectedExit {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Time from start to exit.
        #[serde(with = "duration_ms")]
        elapsed: Duration,
    },
    /// The process never started.
    LaunchFailed {
        /// Launch failure detail.
        reason: String,
    },
    /// The process could not be observed to completion.
    SupervisionFailed {
        /// What went wrong while waiting on the process.
        reason: String,
    },
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { bound } => {
                write!(f, "did not complete within {}", humantime::format_duration(*bound))
            }
            Self::PrematureExit { code, elapsed } => write!(
                f,
                "exited after {} ({}) but was expected to keep running",
                humantime::format_duration(*elapsed),
                describe_code(*code)
            ),
            Self::UnexpectedExit { code, elapsed } => write!(
                f,
                "failed after {} ({})",
                humantime::format_duration(*elapsed),
                describe_code(*code)
            ),
            Self::LaunchFailed { reason } => write!(f, "could not be started: {reason}"),
            Self::SupervisionFailed { reason } => write!(f, "could not be supervised: {reason}"),
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"))
}

/// Error raised when a process group does not meet its expected outcome.
#[derive(Debug, Clone, Error)]
#[error("{label} failed: {}", describe_failures(.failures))]
pub struct GroupViolation {
    /// Human-readable label of the group.
    pub label: String,
    /// The members that violated the expected outcome.
    pub failures: Vec<(ProcessId, ViolationKind)>,
}

fn describe_failures(failures: &[(ProcessId, ViolationKind)]) -> String {
    failures
        .iter()
        .map(|(id, kind)| format!("{id} {kind}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl GroupViolation {
    /// Creates a new group violation.
    #[must_use]
    pub fn new(label: impl Into<String>, failures: Vec<(ProcessId, ViolationKind)>) -> Self {
        Self {
            label: label.into(),
            failures,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("label".to_string(), serde_json::json!(self.label));
        map.insert(
            "failures".to_string(),
            serde_json::json!(self
                .failures
                .iter()
                .map(|(id, kind)| serde_json::json!({
                    "process": id.to_string(),
                    "violation": kind,
                }))
                .collect::<Vec<_>>()),
        );
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a plugin definition is malformed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PluginValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PluginValidationError {
    /// Creates a new plugin validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration document was malformed.
    #[error("Invalid config: {0}")]
    Parse(String),

    /// An environment override held an unusable value.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv {
        /// The environment variable.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Error raised when a duration literal such as `"10s"` is invalid.
#[derive(Debug, Clone, Error)]
pub enum DurationParseError {
    /// The literal is not a recognised duration.
    #[error("Invalid duration '{literal}': {reason}")]
    Invalid {
        /// The rejected literal.
        literal: String,
        /// Parser message.
        reason: String,
    },

    /// Time bounds must be positive.
    #[error("Duration '{0}' must be greater than zero")]
    NotPositive(String),

    /// The success mode keyword is unknown.
    #[error("Unknown success mode '{0}' (expected clean-exit or never-completes)")]
    UnknownMode(String),
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
