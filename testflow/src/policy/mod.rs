//! Expected-outcome policies for launched processes.
//!
//! A policy pairs a success mode with a time bound and classifies what a
//! supervised process did against it. Classification has no side effects;
//! the supervisor terminates a process only when the decision says so.

mod expected;
mod literal;

pub use expected::{ExpectedOutcome, OutcomeBuilder, PolicyDecision, SuccessMode, Verdict};
pub use literal::parse_bound;
