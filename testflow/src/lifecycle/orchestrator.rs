//! Drives a plugin through setUp, its execute stages and tearDown.

use super::{LifecycleState, ResultAggregator, RunReport};
use crate::config::EngineConfig;
use crate::context::{RunIdentity, TestContext, TestEnvironment};
use crate::core::StageKind;
use crate::errors::TestflowResult;
use crate::events::{kinds, EventSink, NoOpEventSink};
use crate::plugin::{validate_plugin, Plugin};
use crate::process::ProcessLauncher;
use crate::stages::StageRunner;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs plugins and produces run reports.
///
/// An orchestrator runs one plugin at a time; [`LifecycleOrchestrator::state`]
/// reflects the run in progress.
pub struct LifecycleOrchestrator {
    config: Arc<EngineConfig>,
    events: Arc<dyn EventSink>,
    launcher: Option<Arc<dyn ProcessLauncher>>,
    state: RwLock<LifecycleState>,
}

impl std::fmt::Debug for LifecycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for LifecycleOrchestrator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl LifecycleOrchestrator {
    /// Creates an orchestrator with `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            events: Arc::new(NoOpEventSink),
            launcher: None,
            state: RwLock::new(LifecycleState::NotStarted),
        }
    }

    /// Sets the event sink used for run, stage and process events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replaces the default process launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Runs `plugin` to completion.
    ///
    /// Stage failures never surface here; they are recorded in the report.
    ///
    /// # Errors
    ///
    /// Fails before any stage runs when the plugin is invalid, the test
    /// environment cannot be created, or `plugin_init` fails.
    pub async fn run(&self, plugin: &dyn Plugin) -> TestflowResult<RunReport> {
        validate_plugin(plugin)?;
        let identity = RunIdentity::new(plugin.name());
        let env = TestEnvironment::prepare(&self.config, &identity)?;
        self.run_with(plugin, identity, env).await
    }

    /// Runs `plugin` with a caller-provided identity and environment.
    ///
    /// # Errors
    ///
    /// As [`LifecycleOrchestrator::run`], minus environment creation.
    pub async fn run_with(
        &self,
        plugin: &dyn Plugin,
        identity: RunIdentity,
        env: TestEnvironment,
    ) -> TestflowResult<RunReport> {
        validate_plugin(plugin)?;
        *self.state.write() = LifecycleState::NotStarted;

        let mut ctx = TestContext::new(identity.clone(), env, Arc::clone(&self.config))
            .with_event_sink(Arc::clone(&self.events));
        if let Some(launcher) = &self.launcher {
            ctx = ctx.with_launcher(Arc::clone(launcher));
        }

        let span = info_span!("run", plugin = %identity.plugin, run_id = %identity.run_id);
        self.drive(plugin, &ctx, identity).instrument(span).await
    }

    async fn drive(
        &self,
        plugin: &dyn Plugin,
        ctx: &TestContext,
        identity: RunIdentity,
    ) -> TestflowResult<RunReport> {
        info!(tmp_dir = %ctx.env().tmp_dir().display(), "starting run");
        self.events
            .emit(
                kinds::RUN_STARTED,
                Some(json!({
                    "plugin": identity.plugin,
                    "run_id": identity.run_id.to_string(),
                })),
            )
            .await;

        if let Err(e) = plugin.plugin_init(ctx).await {
            error!(error = %e, "plugin initialisation failed; no stages will run");
            self.events
                .emit(
                    kinds::RUN_COMPLETED,
                    Some(json!({ "plugin": identity.plugin, "aborted": true, "error": e.to_string() })),
                )
                .await;
            return Err(e);
        }

        let runner = StageRunner::new(Arc::clone(&self.events));
        let stages = plugin.execute_stages();
        let mut aggregator = ResultAggregator::new(identity);
        let mut setup_passed = false;
        let mut state = LifecycleState::NotStarted;

        loop {
            state = state.next(setup_passed, stages.len());
            *self.state.write() = state;

            let outcome = match state {
                LifecycleState::RunningSetup => {
                    let outcome = runner
                        .run_stage("setUp", StageKind::SetUp, plugin.set_up(ctx))
                        .await;
                    setup_passed = outcome.is_success();
                    if !setup_passed {
                        warn!(skipped = stages.len(), "setUp failed; skipping execute stages");
                    }
                    outcome
                }
                LifecycleState::RunningExecute(i) => {
                    let name = &stages[i];
                    runner
                        .run_stage(name, StageKind::Execute, plugin.execute(name, ctx))
                        .await
                }
                LifecycleState::RunningTeardown => {
                    runner
                        .run_stage("tearDown", StageKind::TearDown, plugin.tear_down(ctx))
                        .await
                }
                LifecycleState::NotStarted | LifecycleState::Done => break,
            };
            aggregator.record(outcome);
        }

        aggregator.record_processes(ctx.take_group_verdicts());
        let report = aggregator.finish();

        if report.passed() {
            info!(stages = report.outcomes().len(), "run passed");
        } else {
            warn!(failed = ?report.failed_stages(), "run failed");
        }
        self.events
            .emit(
                kinds::RUN_COMPLETED,
                Some(json!({
                    "plugin": report.plugin,
                    "verdict": report.verdict(),
                    "failed_stages": report.failed_stages(),
                })),
            )
            .await;
        Ok(report)
    }
}
