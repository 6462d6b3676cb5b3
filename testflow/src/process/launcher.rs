//! Process launching.

use super::output::spawn_output_consumers;
use super::{Echo, OutputTail, ProcessDefinition, ProcessHandle, ProcessId};
use crate::errors::LaunchError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Starts external processes.
///
/// Implementations must report every failure as a [`LaunchError`]; nothing
/// may panic past this boundary.
pub trait ProcessLauncher: Send + Sync {
    /// Launches one process.
    fn launch(
        &self,
        definition: &ProcessDefinition,
        id: &ProcessId,
        echo: Echo,
    ) -> Result<ProcessHandle, LaunchError>;
}

/// Launcher backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    /// Number of output lines kept per process.
    tail_lines: usize,
}

impl TokioLauncher {
    /// Creates a launcher that keeps `tail_lines` lines of output per process.
    #[must_use]
    pub fn new(tail_lines: usize) -> Self {
        Self { tail_lines }
    }

    fn command(definition: &ProcessDefinition) -> Command {
        let mut cmd = Command::new(&definition.program);
        cmd.args(&definition.args)
            .envs(&definition.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &definition.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for TokioLauncher {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &self,
        definition: &ProcessDefinition,
        id: &ProcessId,
        echo: Echo,
    ) -> Result<ProcessHandle, LaunchError> {
        debug!(process = %id, command = %definition.command_line(), "launching");

        let mut child = Self::command(definition)
            .spawn()
            .map_err(|e| LaunchError::new(id.to_string(), &definition.program, e.to_string()))?;

        let tail = OutputTail::new(self.tail_lines);
        let readers = spawn_output_consumers(&mut child, id, echo, &tail);

        let handle = ProcessHandle::new(id.clone(), child, tail).with_readers(readers);
        info!(process = %id, pid = ?handle.pid(), program = %definition.program, "process started");
        Ok(handle)
    }
}
