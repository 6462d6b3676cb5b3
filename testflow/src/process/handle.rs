//! Handles for launched processes.

use super::terminate::{force_kill, terminate_gracefully};
use super::{OutputTail, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Current state of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Still running.
    Running,
    /// Exited on its own; `None` when ended by a signal.
    Exited(Option<i32>),
    /// Forcibly terminated by the supervisor.
    Killed,
}

impl ProcessStatus {
    /// Returns true once the process is no longer running.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Exited(Some(code)) => write!(f, "exited({code})"),
            Self::Exited(None) => write!(f, "exited(signal)"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

/// A launched process, exclusively owned by whoever supervises it.
#[derive(Debug)]
pub struct ProcessHandle {
    id: ProcessId,
    pid: Option<u32>,
    started_at: Instant,
    status: ProcessStatus,
    child: Child,
    output: OutputTail,
    readers: Vec<JoinHandle<()>>,
}

impl ProcessHandle {
    /// Wraps a freshly spawned child.
    #[must_use]
    pub fn new(id: ProcessId, child: Child, output: OutputTail) -> Self {
        Self {
            id,
            pid: child.id(),
            started_at: Instant::now(),
            status: ProcessStatus::Running,
            child,
            output,
            readers: Vec::new(),
        }
    }

    /// Attaches the tasks draining the child's output.
    #[must_use]
    pub fn with_readers(mut self, readers: Vec<JoinHandle<()>>) -> Self {
        self.readers = readers;
        self
    }

    /// Returns the process id.
    #[must_use]
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Returns the OS pid, if the process had one at launch.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns when the process was started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns time since start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Returns the captured output tail.
    #[must_use]
    pub fn output(&self) -> &OutputTail {
        &self.output
    }

    /// Waits for the process to exit on its own.
    ///
    /// # Errors
    ///
    /// Fails if the OS wait call fails.
    pub async fn wait(&mut self) -> std::io::Result<ProcessStatus> {
        let exit = self.child.wait().await?;
        self.status = ProcessStatus::Exited(exit.code());
        Ok(self.status)
    }

    /// Waits up to `limit` for the output readers to reach end of stream.
    ///
    /// Call after the process is gone so the tail holds its last words.
    /// Readers still blocked at the limit (a grandchild holding the pipe
    /// open, for instance) are abandoned.
    pub async fn collect_output(&mut self, limit: Duration) {
        let readers = std::mem::take(&mut self.readers);
        if readers.is_empty() {
            return;
        }
        if tokio::time::timeout(limit, futures::future::join_all(readers))
            .await
            .is_err()
        {
            debug!(process = %self.id, "output readers still open");
        }
    }

    /// Terminates the process: a polite signal first, then a hard kill if it
    /// is still alive after `grace`.
    ///
    /// # Errors
    ///
    /// Fails if the hard kill or the wait after the signal fails.
    pub async fn terminate(&mut self, grace: Duration) -> std::io::Result<ProcessStatus> {
        let signalled = match self.pid {
            Some(pid) => terminate_gracefully(pid).unwrap_or_else(|e| {
                warn!(process = %self.id, pid, error = %e, "termination signal failed");
                false
            }),
            None => false,
        };

        if signalled {
            if let Ok(exit) = tokio::time::timeout(grace, self.child.wait()).await {
                exit?;
                debug!(process = %self.id, "stopped after termination signal");
                self.status = ProcessStatus::Killed;
                return Ok(self.status);
            }
            debug!(process = %self.id, grace = ?grace, "still alive after grace period");
        }

        force_kill(&mut self.child).await?;
        self.status = ProcessStatus::Killed;
        Ok(self.status)
    }
}
