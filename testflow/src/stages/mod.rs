//! Stage execution.
//!
//! A stage body is any future yielding a [`StageResult`]. The
//! [`StageRunner`] turns it into exactly one [`crate::core::StageOutcome`].

mod runner;

pub use runner::StageRunner;

use crate::errors::TestflowError;

/// What a stage body returns.
pub type StageResult = Result<(), TestflowError>;
