//! Expected outcome values and their classification rules.

use super::parse_bound;
use crate::errors::{DurationParseError, ViolationKind};
use crate::process::ProcessStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What counts as success for a launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessMode {
    /// The process must exit with code 0 before the bound.
    #[serde(alias = "clean_exit", alias = "cleanRun", alias = "clean-run")]
    CleanExit,
    /// The process must still be running at the bound; it is then terminated.
    #[serde(alias = "never_completes", alias = "neverCompletes")]
    NeverCompletes,
}

impl fmt::Display for SuccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CleanExit => write!(f, "clean-exit"),
            Self::NeverCompletes => write!(f, "never-completes"),
        }
    }
}

impl FromStr for SuccessMode {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "clean-exit" | "clean_exit" | "cleanRun" | "clean-run" => Ok(Self::CleanExit),
            "never-completes" | "never_completes" | "neverCompletes" => Ok(Self::NeverCompletes),
            other => Err(DurationParseError::UnknownMode(other.to_string())),
        }
    }
}

/// Whether an observed process met its expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Behaviour matched the expected outcome.
    Success,
    /// Behaviour did not match.
    Violation {
        /// How the expectation was broken.
        kind: ViolationKind,
    },
}

impl Verdict {
    /// Returns true for [`Verdict::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the violation, if any.
    #[must_use]
    pub fn violation(&self) -> Option<&ViolationKind> {
        match self {
            Self::Success => None,
            Self::Violation { kind } => Some(kind),
        }
    }

    fn violated(kind: ViolationKind) -> Self {
        Self::Violation { kind }
    }
}

/// Result of classifying one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// The verdict for the observation.
    pub verdict: Verdict,
    /// Whether the supervisor must forcibly terminate the process.
    pub terminate: bool,
}

/// Declarative policy for judging a launched process.
///
/// The bound is always positive and finite; constructors enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpectedOutcomeRepr", into = "ExpectedOutcomeRepr")]
pub struct ExpectedOutcome {
    mode: SuccessMode,
    bound: Duration,
}

impl ExpectedOutcome {
    /// Creates a policy from a mode and a bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the bound is zero.
    pub fn new(mode: SuccessMode, bound: Duration) -> Result<Self, DurationParseError> {
        if bound.is_zero() {
            return Err(DurationParseError::NotPositive(
                humantime::format_duration(bound).to_string(),
            ));
        }
        Ok(Self { mode, bound })
    }

    /// Parses the literal form, e.g. `("clean-exit", "10s")`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown mode keyword or an invalid or zero bound.
    pub fn parse(mode: &str, within: &str) -> Result<Self, DurationParseError> {
        Self::new(mode.parse()?, parse_bound(within)?)
    }

    /// Starts a clean-exit policy; finish it with [`OutcomeBuilder::within`].
    #[must_use]
    pub fn clean_run() -> OutcomeBuilder {
        OutcomeBuilder {
            mode: SuccessMode::CleanExit,
        }
    }

    /// Starts a never-completes policy; finish it with [`OutcomeBuilder::within`].
    #[must_use]
    pub fn never_completes() -> OutcomeBuilder {
        OutcomeBuilder {
            mode: SuccessMode::NeverCompletes,
        }
    }

    /// Returns the success mode.
    #[must_use]
    pub fn mode(&self) -> SuccessMode {
        self.mode
    }

    /// Returns the time bound.
    #[must_use]
    pub fn bound(&self) -> Duration {
        self.bound
    }

    /// Classifies a process status observed `elapsed` after start.
    ///
    /// `Running` means the process was observed alive at the deadline.
    /// `Killed` is the status recorded after a policy-ordered termination and
    /// is judged the same way, since the process was alive when the deadline
    /// decision was made.
    #[must_use]
    pub fn classify(&self, status: ProcessStatus, elapsed: Duration) -> PolicyDecision {
        match (self.mode, status) {
            (SuccessMode::CleanExit, ProcessStatus::Running | ProcessStatus::Killed) => {
                PolicyDecision {
                    verdict: Verdict::violated(ViolationKind::Timeout { bound: self.bound }),
                    terminate: status == ProcessStatus::Running,
                }
            }
            (SuccessMode::CleanExit, ProcessStatus::Exited(code)) => {
                let verdict = if elapsed >= self.bound {
                    Verdict::violated(ViolationKind::Timeout { bound: self.bound })
                } else if code == Some(0) {
                    Verdict::Success
                } else {
                    Verdict::violated(ViolationKind::UnexpectedExit { code, elapsed })
                };
                PolicyDecision {
                    verdict,
                    terminate: false,
                }
            }
            (SuccessMode::NeverCompletes, ProcessStatus::Running | ProcessStatus::Killed) => {
                PolicyDecision {
                    verdict: Verdict::Success,
                    terminate: status == ProcessStatus::Running,
                }
            }
            (SuccessMode::NeverCompletes, ProcessStatus::Exited(code)) => {
                // An exit seen at or after the bound means it was alive at the bound.
                let verdict = if elapsed >= self.bound {
                    Verdict::Success
                } else {
                    Verdict::violated(ViolationKind::PrematureExit { code, elapsed })
                };
                PolicyDecision {
                    verdict,
                    terminate: false,
                }
            }
        }
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} within {}",
            self.mode,
            humantime::format_duration(self.bound)
        )
    }
}

/// Half-built policy waiting for its time bound.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeBuilder {
    mode: SuccessMode,
}

impl OutcomeBuilder {
    /// Completes the policy with a bound literal such as `"10s"`.
    ///
    /// # Errors
    ///
    /// Fails if `literal` is not a valid positive duration.
    pub fn within(self, literal: &str) -> Result<ExpectedOutcome, DurationParseError> {
        ExpectedOutcome::new(self.mode, parse_bound(literal)?)
    }

    /// Completes the policy with an explicit bound.
    ///
    /// # Errors
    ///
    /// Fails if `bound` is zero.
    pub fn within_duration(self, bound: Duration) -> Result<ExpectedOutcome, DurationParseError> {
        ExpectedOutcome::new(self.mode, bound)
    }
}

/// Serialized form: `{ "mode": "clean-exit", "within": "10s" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedOutcomeRepr {
    /// Success mode keyword.
    pub mode: SuccessMode,
    /// Bound literal.
    pub within: String,
}

impl TryFrom<ExpectedOutcomeRepr> for ExpectedOutcome {
    type Error = DurationParseError;

    fn try_from(raw: ExpectedOutcomeRepr) -> Result<Self, Self::Error> {
        Self::new(raw.mode, parse_bound(&raw.within)?)
    }
}

impl From<ExpectedOutcome> for ExpectedOutcomeRepr {
    fn from(outcome: ExpectedOutcome) -> Self {
        Self {
            mode: outcome.mode,
            within: humantime::format_duration(outcome.bound).to_string(),
        }
    }
}
