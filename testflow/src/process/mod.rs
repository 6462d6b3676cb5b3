//! Launching and supervising child processes.
//!
//! This module provides:
//! - Process definitions and groups ("run N copies" with one expected outcome)
//! - A launcher seam with a tokio-based implementation
//! - Handles that own a running child and drain its output
//! - The supervisor that enforces expected outcomes across a group

mod definition;
mod handle;
mod launcher;
mod output;
mod supervisor;
mod terminate;

pub use definition::{Echo, ProcessDefinition, ProcessGroup, ProcessId};
pub use handle::{ProcessHandle, ProcessStatus};
pub use launcher::{ProcessLauncher, TokioLauncher};
pub use output::OutputTail;
pub use supervisor::{GroupVerdict, MemberVerdict, ProcessSupervisor};
pub use terminate::{force_kill, terminate_gracefully};
