//! The context handed to every stage body.

use super::{RunIdentity, TestEnvironment};
use crate::config::EngineConfig;
use crate::errors::TestflowResult;
use crate::events::EventSink;
use crate::policy::ExpectedOutcome;
use crate::process::{
    Echo, GroupVerdict, ProcessDefinition, ProcessGroup, ProcessLauncher, ProcessSupervisor,
    TokioLauncher,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Everything a plugin can do during a run.
///
/// Process calls block the calling stage until the whole group has settled
/// and return `Err` when the group violated its expected outcome, so stage
/// bodies can simply use `?`.
pub struct TestContext {
    identity: RunIdentity,
    env: TestEnvironment,
    config: Arc<EngineConfig>,
    launcher: Arc<dyn ProcessLauncher>,
    supervisor: ProcessSupervisor,
    groups: Mutex<Vec<GroupVerdict>>,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("identity", &self.identity)
            .field("env", &self.env)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestContext {
    /// Creates a context backed by [`TokioLauncher`].
    #[must_use]
    pub fn new(identity: RunIdentity, env: TestEnvironment, config: Arc<EngineConfig>) -> Self {
        let launcher = Arc::new(TokioLauncher::new(config.output_tail_lines));
        let supervisor = ProcessSupervisor::new(config.kill_grace());
        Self {
            identity,
            env,
            config,
            launcher,
            supervisor,
            groups: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the process launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Routes process events to `events`.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.supervisor = self.supervisor.with_event_sink(events);
        self
    }

    /// Creates a context with default config and scratch dir `tmp_dir`.
    #[must_use]
    pub fn for_tests(plugin: &str, tmp_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            RunIdentity::new(plugin),
            TestEnvironment::new(tmp_dir),
            Arc::new(EngineConfig::default()),
        )
    }

    /// Run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.identity.run_id
    }

    /// Directories for this run.
    #[must_use]
    pub fn env(&self) -> &TestEnvironment {
        &self.env
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one process and waits until it meets or breaks `expected`.
    ///
    /// # Errors
    ///
    /// Fails when the group is malformed or the process violates `expected`.
    pub async fn do_run_foreground_process(
        &self,
        label: &str,
        mnemonic: &str,
        echo: impl Into<Echo>,
        expected: ExpectedOutcome,
        definition: ProcessDefinition,
    ) -> TestflowResult<GroupVerdict> {
        self.do_run_foreground_processes(label, mnemonic, 1, echo, expected, definition)
            .await
    }

    /// Runs `instances` copies of a process concurrently and waits for all.
    ///
    /// # Errors
    ///
    /// Fails when the group is malformed or any copy violates `expected`.
    pub async fn do_run_foreground_processes(
        &self,
        label: &str,
        mnemonic: &str,
        instances: usize,
        echo: impl Into<Echo>,
        expected: ExpectedOutcome,
        definition: ProcessDefinition,
    ) -> TestflowResult<GroupVerdict> {
        let group = ProcessGroup::new(label, mnemonic, expected, definition)
            .with_instances(instances)
            .with_echo(echo.into());
        self.run_group(&group).await
    }

    /// Supervises a prepared group.
    ///
    /// # Errors
    ///
    /// Fails when the group is malformed or any member violates its expected
    /// outcome.
    pub async fn run_group(&self, group: &ProcessGroup) -> TestflowResult<GroupVerdict> {
        group.validate()?;
        let verdict = self.supervisor.run_group(self.launcher.as_ref(), group).await;
        self.groups.lock().push(verdict.clone());
        verdict.into_result()
    }

    /// Writes `contents` to `path`, creating parent directories.
    ///
    /// Relative paths are resolved against the scratch directory. Returns
    /// the path written.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    pub async fn do_write_file(
        &self,
        comment: &str,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> TestflowResult<PathBuf> {
        let path = self.env.resolve(path);
        info!(file = %path.display(), "{comment}");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Every group verdict recorded so far, in completion order.
    #[must_use]
    pub fn group_verdicts(&self) -> Vec<GroupVerdict> {
        self.groups.lock().clone()
    }

    pub(crate) fn take_group_verdicts(&self) -> Vec<GroupVerdict> {
        std::mem::take(&mut *self.groups.lock())
    }
}
