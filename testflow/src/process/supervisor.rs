//! Supervision of process groups against their expected outcome.
//!
//! Every member of a group is launched, then watched on its own task until
//! it exits or the shared deadline passes. The group verdict is the AND of
//! the member verdicts.

use super::{ProcessGroup, ProcessHandle, ProcessId, ProcessLauncher, ProcessStatus};
use crate::errors::{duration_ms, GroupViolation, TestflowError, ViolationKind};
use crate::events::{kinds, EventSink, NoOpEventSink};
use crate::policy::{ExpectedOutcome, Verdict};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome for one member of a group.
#[derive(Debug, Clone, Serialize)]
pub struct MemberVerdict {
    /// Which member.
    pub process: ProcessId,
    /// Final observed status; `None` if the process never started.
    pub status: Option<ProcessStatus>,
    /// Time from launch to the final observation.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// Policy verdict.
    pub verdict: Verdict,
    /// Last captured output lines.
    pub output_tail: Vec<String>,
}

impl MemberVerdict {
    fn unobserved(process: ProcessId, kind: ViolationKind) -> Self {
        Self {
            process,
            status: None,
            elapsed: Duration::ZERO,
            verdict: Verdict::Violation { kind },
            output_tail: Vec::new(),
        }
    }

    /// Returns true if the member met its expected outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.verdict.is_success()
    }
}

/// Combined outcome of a process group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupVerdict {
    /// Group label.
    pub label: String,
    /// The expected outcome every member was judged against.
    pub expected: ExpectedOutcome,
    /// Member verdicts in launch order.
    pub members: Vec<MemberVerdict>,
}

impl GroupVerdict {
    /// AND of all member verdicts.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.members.iter().all(MemberVerdict::is_success)
    }

    /// Members that violated the expected outcome.
    #[must_use]
    pub fn failures(&self) -> Vec<(ProcessId, ViolationKind)> {
        self.members
            .iter()
            .filter_map(|m| m.verdict.violation().map(|k| (m.process.clone(), k.clone())))
            .collect()
    }

    /// Converts a failed group into an error so stage bodies can use `?`.
    ///
    /// # Errors
    ///
    /// Returns [`TestflowError::Violation`] listing every failed member.
    pub fn into_result(self) -> Result<Self, TestflowError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GroupViolation::new(self.label.clone(), self.failures()).into())
        }
    }
}

const OUTPUT_FLUSH_LIMIT: Duration = Duration::from_millis(250);

enum Member {
    Settled(MemberVerdict),
    Watched(ProcessId, JoinHandle<MemberVerdict>),
}

/// Runs process groups and enforces their expected outcome.
#[derive(Clone)]
pub struct ProcessSupervisor {
    kill_grace: Duration,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("kill_grace", &self.kill_grace)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Creates a supervisor that waits `kill_grace` between the termination
    /// signal and the hard kill.
    #[must_use]
    pub fn new(kill_grace: Duration) -> Self {
        Self {
            kill_grace,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the configured kill grace period.
    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        self.kill_grace
    }

    /// Launches every member of `group` and waits for all of them to settle.
    ///
    /// Launch failures become member violations; they never abort siblings.
    pub async fn run_group(&self, launcher: &dyn ProcessLauncher, group: &ProcessGroup) -> GroupVerdict {
        let expected = group.expected;
        let deadline = Instant::now() + expected.bound();
        info!(
            group = %group.label,
            instances = group.instances,
            expected = %expected,
            "starting process group"
        );

        let mut members = Vec::with_capacity(group.instances);
        for id in group.member_ids() {
            match launcher.launch(&group.definition, &id, group.echo) {
                Ok(handle) => {
                    self.events.try_emit(
                        kinds::PROCESS_STARTED,
                        Some(json!({
                            "group": group.label,
                            "process": id.to_string(),
                            "pid": handle.pid(),
                        })),
                    );
                    let task = tokio::spawn(watch(
                        handle,
                        expected,
                        deadline,
                        self.kill_grace,
                        Arc::clone(&self.events),
                    ));
                    members.push(Member::Watched(id, task));
                }
                Err(e) => {
                    warn!(group = %group.label, process = %id, error = %e, "launch failed");
                    self.events.try_emit(
                        kinds::PROCESS_LAUNCH_FAILED,
                        Some(json!({
                            "group": group.label,
                            "process": id.to_string(),
                            "reason": e.reason,
                        })),
                    );
                    members.push(Member::Settled(MemberVerdict::unobserved(
                        id,
                        ViolationKind::LaunchFailed { reason: e.reason },
                    )));
                }
            }
        }

        let members = join_all(members.into_iter().map(|member| async move {
            match member {
                Member::Settled(verdict) => verdict,
                Member::Watched(id, task) => task.await.unwrap_or_else(|e| {
                    MemberVerdict::unobserved(
                        id,
                        ViolationKind::SupervisionFailed {
                            reason: e.to_string(),
                        },
                    )
                }),
            }
        }))
        .await;

        let verdict = GroupVerdict {
            label: group.label.clone(),
            expected,
            members,
        };
        if verdict.is_success() {
            info!(group = %verdict.label, "process group met its expected outcome");
        } else {
            for (id, kind) in verdict.failures() {
                warn!(group = %verdict.label, process = %id, violation = %kind, "process violated expected outcome");
            }
        }
        verdict
    }
}

async fn watch(
    mut handle: ProcessHandle,
    expected: ExpectedOutcome,
    deadline: Instant,
    grace: Duration,
    events: Arc<dyn EventSink>,
) -> MemberVerdict {
    let id = handle.id().clone();

    let observed = match tokio::time::timeout_at(deadline, handle.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            warn!(process = %id, error = %e, "failed waiting on process");
            return MemberVerdict {
                process: id,
                status: Some(handle.status()),
                elapsed: handle.elapsed(),
                verdict: Verdict::Violation {
                    kind: ViolationKind::SupervisionFailed {
                        reason: e.to_string(),
                    },
                },
                output_tail: handle.output().lines(),
            };
        }
        Err(_) => ProcessStatus::Running,
    };

    let elapsed = handle.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let decision = expected.classify(observed, elapsed);
    debug!(
        process = %id,
        status = %observed,
        elapsed_ms,
        success = decision.verdict.is_success(),
        "classified process"
    );

    if decision.terminate {
        if let Err(e) = handle.terminate(grace).await {
            warn!(process = %id, error = %e, "failed to terminate process");
        }
        info!(process = %id, elapsed_ms, "process terminated at deadline");
        events.try_emit(
            kinds::PROCESS_KILLED,
            Some(json!({ "process": id.to_string(), "elapsed_ms": elapsed_ms })),
        );
    } else {
        info!(process = %id, status = %observed, elapsed_ms, "process exited");
        events.try_emit(
            kinds::PROCESS_EXITED,
            Some(json!({
                "process": id.to_string(),
                "status": observed.to_string(),
                "elapsed_ms": elapsed_ms,
            })),
        );
    }

    handle.collect_output(OUTPUT_FLUSH_LIMIT).await;
    MemberVerdict {
        process: id,
        status: Some(handle.status()),
        elapsed,
        verdict: decision.verdict,
        output_tail: handle.output().lines(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::process::{ProcessDefinition, TokioLauncher};

    fn sh(script: &str) -> ProcessDefinition {
        ProcessDefinition::new("sh").args(["-c", script])
    }

    fn supervisor() -> ProcessSupervisor {
        ProcessSupervisor::new(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_clean_exit_group_passes() {
        let group = ProcessGroup::new(
            "Run quick tool",
            "QT",
            ExpectedOutcome::clean_run().within("5s").unwrap(),
            sh("echo done"),
        )
        .with_instances(2);

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        assert!(verdict.is_success());
        assert_eq!(verdict.members.len(), 2);
        assert_eq!(verdict.members[0].status, Some(ProcessStatus::Exited(Some(0))));
        assert!(verdict.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_one_failing_copy_fails_the_group() {
        let group = ProcessGroup::new(
            "Run multiple processes",
            "CL",
            ExpectedOutcome::clean_run().within("5s").unwrap(),
            sh("test \"$COPY\" != 2").env("COPY", "1"),
        )
        .with_instances(3);

        // Instance 2 gets a distinct environment through a wrapping launcher.
        struct PerInstance(TokioLauncher);
        impl ProcessLauncher for PerInstance {
            fn launch(
                &self,
                definition: &ProcessDefinition,
                id: &ProcessId,
                echo: crate::process::Echo,
            ) -> Result<ProcessHandle, crate::errors::LaunchError> {
                let def = definition.clone().env("COPY", id.instance().to_string());
                self.0.launch(&def, id, echo)
            }
        }

        let verdict = supervisor()
            .run_group(&PerInstance(TokioLauncher::default()), &group)
            .await;
        assert!(!verdict.is_success());

        let failures = verdict.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ProcessId::new("CL", 2));
        assert!(matches!(
            failures[0].1,
            ViolationKind::UnexpectedExit { code: Some(1), .. }
        ));

        let err = verdict.into_result().unwrap_err();
        assert!(err.to_string().contains("CL2"));
    }

    #[tokio::test]
    async fn test_clean_exit_timeout_is_killed() {
        let events = Arc::new(CollectingEventSink::new());
        let group = ProcessGroup::new(
            "Run hanging tool",
            "HT",
            ExpectedOutcome::clean_run().within("300ms").unwrap(),
            sh("sleep 30"),
        );

        let started = std::time::Instant::now();
        let verdict = supervisor()
            .with_event_sink(events.clone())
            .run_group(&TokioLauncher::default(), &group)
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        let member = &verdict.members[0];
        assert_eq!(member.status, Some(ProcessStatus::Killed));
        assert!(matches!(
            member.verdict.violation(),
            Some(ViolationKind::Timeout { .. })
        ));
        assert_eq!(events.events_of_type(kinds::PROCESS_KILLED).len(), 1);
    }

    #[tokio::test]
    async fn test_never_completes_killed_at_deadline_is_success() {
        let group = ProcessGroup::new(
            "Run server",
            "SV",
            ExpectedOutcome::never_completes().within("300ms").unwrap(),
            sh("while true; do sleep 1; done"),
        );

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        assert!(verdict.is_success());
        assert_eq!(verdict.members[0].status, Some(ProcessStatus::Killed));
    }

    #[tokio::test]
    async fn test_never_completes_early_exit_is_violation() {
        let group = ProcessGroup::new(
            "Run server",
            "SV",
            ExpectedOutcome::never_completes().within("5s").unwrap(),
            sh("exit 0"),
        );

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        assert!(!verdict.is_success());
        assert!(matches!(
            verdict.members[0].verdict.violation(),
            Some(ViolationKind::PrematureExit { code: Some(0), .. })
        ));
    }

    #[tokio::test]
    async fn test_launch_failure_does_not_abort_siblings() {
        struct FailSecond(TokioLauncher);
        impl ProcessLauncher for FailSecond {
            fn launch(
                &self,
                definition: &ProcessDefinition,
                id: &ProcessId,
                echo: crate::process::Echo,
            ) -> Result<ProcessHandle, crate::errors::LaunchError> {
                if id.instance() == 2 {
                    let missing = ProcessDefinition::new("/definitely/not/a/real/binary");
                    return self.0.launch(&missing, id, echo);
                }
                self.0.launch(definition, id, echo)
            }
        }

        let events = Arc::new(CollectingEventSink::new());
        let group = ProcessGroup::new(
            "Run pair",
            "P",
            ExpectedOutcome::clean_run().within("5s").unwrap(),
            sh("true"),
        )
        .with_instances(3);

        let verdict = supervisor()
            .with_event_sink(events.clone())
            .run_group(&FailSecond(TokioLauncher::default()), &group)
            .await;

        assert!(!verdict.is_success());
        assert!(verdict.members[0].is_success());
        assert!(verdict.members[2].is_success());
        assert_eq!(verdict.members[1].status, None);
        assert!(matches!(
            verdict.members[1].verdict.violation(),
            Some(ViolationKind::LaunchFailed { .. })
        ));
        assert_eq!(events.events_of_type(kinds::PROCESS_LAUNCH_FAILED).len(), 1);
        assert_eq!(events.events_of_type(kinds::PROCESS_STARTED).len(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_output_tail() {
        let group = ProcessGroup::new(
            "Run noisy tool",
            "NT",
            ExpectedOutcome::clean_run().within("5s").unwrap(),
            sh("echo about to fail >&2; exit 4"),
        );

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        let member = &verdict.members[0];
        assert!(!member.is_success());
        assert_eq!(member.output_tail, vec!["stderr: about to fail".to_string()]);
    }

    #[tokio::test]
    async fn test_binary_output_does_not_disturb_clean_exit() {
        let group = ProcessGroup::new(
            "Run binary tool",
            "BT",
            ExpectedOutcome::clean_run().within("10s").unwrap(),
            sh("printf '\\377\\n'; head -c 1048576 /dev/zero | tr '\\0' a; echo; exit 0"),
        );

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        let member = &verdict.members[0];
        assert_eq!(member.status, Some(ProcessStatus::Exited(Some(0))));
        assert!(member.is_success(), "verdict: {:?}", member.verdict);

        assert_eq!(member.output_tail.len(), 2);
        assert_eq!(member.output_tail[0], "stdout: \u{fffd}");
        assert!(member.output_tail[1].len() < crate::process::output::MAX_LINE_BYTES + 64);
        assert!(member.output_tail[1].ends_with("bytes truncated]"));
    }

    #[tokio::test]
    async fn test_binary_output_does_not_end_a_server_early() {
        let group = ProcessGroup::new(
            "Run binary server",
            "BS",
            ExpectedOutcome::never_completes().within("500ms").unwrap(),
            sh("printf '\\377\\n'; while true; do printf '\\376 tick\\n'; sleep 0.05; done"),
        );

        let verdict = supervisor().run_group(&TokioLauncher::default(), &group).await;
        assert!(verdict.is_success(), "verdict: {:?}", verdict.members[0].verdict);
        assert_eq!(verdict.members[0].status, Some(ProcessStatus::Killed));
    }
}
