//! Core domain model types for testflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage status and kind enums
//! - The immutable per-stage outcome record

mod outcome;
mod status;

pub use outcome::StageOutcome;
pub use status::{StageKind, StageStatus};
