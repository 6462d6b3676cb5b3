//! Lifecycle states and transitions.

use serde::Serialize;
use std::fmt;

/// Where a run is in its lifecycle.
///
/// ```text
/// NotStarted -> RunningSetup
/// RunningSetup --pass--> RunningExecute(0) | RunningTeardown (no execute stages)
/// RunningSetup --fail--> RunningTeardown
/// RunningExecute(i) -> RunningExecute(i + 1) | RunningTeardown (last stage)
/// RunningTeardown -> Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing has run yet.
    #[default]
    NotStarted,
    /// setUp is running.
    RunningSetup,
    /// The execute stage at this index is running.
    RunningExecute(usize),
    /// tearDown is running.
    RunningTeardown,
    /// All stages have been recorded.
    Done,
}

impl LifecycleState {
    /// Returns the state that follows this one.
    ///
    /// `setup_passed` only matters when leaving `RunningSetup`; an execute
    /// stage failure never changes the path. `Done` is terminal.
    #[must_use]
    pub fn next(self, setup_passed: bool, execute_count: usize) -> Self {
        match self {
            Self::NotStarted => Self::RunningSetup,
            Self::RunningSetup if setup_passed && execute_count > 0 => Self::RunningExecute(0),
            Self::RunningSetup => Self::RunningTeardown,
            Self::RunningExecute(i) if i + 1 < execute_count => Self::RunningExecute(i + 1),
            Self::RunningExecute(_) => Self::RunningTeardown,
            Self::RunningTeardown | Self::Done => Self::Done,
        }
    }

    /// Returns true once the run has finished.
    #[must_use]
    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::RunningSetup => write!(f, "running setUp"),
            Self::RunningExecute(i) => write!(f, "running execute stage {i}"),
            Self::RunningTeardown => write!(f, "running tearDown"),
            Self::Done => write!(f, "done"),
        }
    }
}
