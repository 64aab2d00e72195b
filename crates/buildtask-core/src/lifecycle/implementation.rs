use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    crds::{BuildTaskPhase, BuildTaskStatus},
    error::ObservationError,
    formatters::format_job_name,
    lifecycle::{
        DesiredAction, Evaluation, Lifecycle,
        conditions::{REASON_DEADLINE_EXCEEDED, REASON_JOB_FAILED, set_phase_conditions},
        retention,
    },
    models::{ExecutionObservation, ExecutionState, TaskRef},
    validation::ValidatedSpec,
};

impl Lifecycle {
    /// One evaluation step. `Ok(None)` means the tracked Job does not exist.
    #[tracing::instrument(
        name = "lifecycle.evaluate",
        skip_all,
        fields(task = %task.name, namespace = %task.namespace, job_name = %prev.job_name)
    )]
    pub fn evaluate(
        &self,
        task: &TaskRef,
        spec: &ValidatedSpec<'_>,
        prev: &BuildTaskStatus,
        observation: Result<Option<ExecutionObservation>, ObservationError>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let observation = match observation {
            Ok(observation) => observation,
            Err(e) => {
                warn!(error = %e, "Leaving status untouched, observation failed");
                return Evaluation::unchanged(prev);
            }
        };

        if let Some(observed) = observation
            .as_ref()
            .filter(|observed| observed.job_name != prev.job_name)
        {
            warn!(
                observed = %observed.job_name,
                "Ignoring observation of an untracked execution unit"
            );
            return Evaluation::unchanged(prev);
        }

        let mut status = prev.clone();
        status.observed_generation = Some(task.generation);

        let nonce = spec.trigger_nonce();
        let phase = prev.phase.unwrap_or_default();
        let nonce_changed = nonce != prev.last_trigger_nonce;

        // a superseded Job is no longer tracked, so retention would never collect it
        if !prev.job_name.is_empty() && nonce_changed {
            if let Some(observed) = observation.as_ref() {
                if observed.state.is_terminal() {
                    info!(
                        "🗑️ Nonce changed, collecting finished execution unit {}",
                        prev.job_name
                    );
                } else {
                    info!(
                        "🛑 Nonce changed, deleting in-flight execution unit {}",
                        prev.job_name
                    );
                }
                return Evaluation {
                    status,
                    action: DesiredAction::DeleteExecutionUnit(prev.job_name.clone()),
                    requeue_after: None,
                };
            }
        }

        let job_missing = observation.is_none();
        if prev.job_name.is_empty()
            || nonce_changed
            || (job_missing && phase == BuildTaskPhase::Running)
        {
            return self.trigger(task, spec, status, now);
        }

        match phase {
            BuildTaskPhase::Pending | BuildTaskPhase::Running => {
                self.advance(task, spec, status, observation, now)
            }
            BuildTaskPhase::Succeeded | BuildTaskPhase::Failed => {
                retain(spec, status, job_missing, now)
            }
        }
    }

    fn trigger(
        &self,
        task: &TaskRef,
        spec: &ValidatedSpec<'_>,
        mut status: BuildTaskStatus,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let nonce = spec.trigger_nonce();
        let job_name = format_job_name(&task.name, nonce, now);

        status.phase = Some(BuildTaskPhase::Pending);
        status.job_name = job_name.clone();
        status.pod_name.clear();
        status.image_digest.clear();
        status.end_time = None;
        status.start_time = Some(now);
        status.last_trigger_nonce = nonce.to_string();
        set_phase_conditions(
            &mut status,
            BuildTaskPhase::Pending,
            "Triggered",
            &format!("Execution unit {} requested", job_name),
            task.generation,
            now,
        );

        info!("🚀 Triggering execution unit {}", job_name);

        let job = self.renderer.render(task, spec, &job_name);
        Evaluation {
            status,
            action: DesiredAction::CreateExecutionUnit(Box::new(job)),
            requeue_after: time_until_deadline(spec, now, now),
        }
    }

    fn advance(
        &self,
        task: &TaskRef,
        spec: &ValidatedSpec<'_>,
        mut status: BuildTaskStatus,
        observation: Option<ExecutionObservation>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let started = status.start_time.unwrap_or(now);
        let timed_out = spec
            .spec
            .timeout_seconds
            .is_some_and(|timeout| (now - started).num_seconds() >= timeout);

        let Some(observed) = observation else {
            if timed_out {
                return fail(task, status, REASON_DEADLINE_EXCEEDED, now);
            }

            // create is idempotent by name, so asking again is harmless
            debug!("Execution unit not found yet, requesting it again");
            let job = self.renderer.render(task, spec, &status.job_name);
            let requeue_after = time_until_deadline(spec, started, now);
            return Evaluation {
                status,
                action: DesiredAction::CreateExecutionUnit(Box::new(job)),
                requeue_after,
            };
        };

        match observed.state {
            ExecutionState::Succeeded => succeed(task, status, observed, now),
            ExecutionState::Failed => {
                let reason = observed
                    .failure_reason
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .unwrap_or(REASON_JOB_FAILED);
                fail(task, status, reason, now)
            }
            _ if timed_out => fail(task, status, REASON_DEADLINE_EXCEEDED, now),
            ExecutionState::Running => {
                if let Some(pod_name) = observed.pod_name {
                    status.pod_name = pod_name;
                }
                if status.phase != Some(BuildTaskPhase::Running) {
                    info!("🏗️ Execution unit {} is running", status.job_name);
                }
                status.phase = Some(BuildTaskPhase::Running);
                let message = format!("Execution unit {} is running", status.job_name);
                set_phase_conditions(
                    &mut status,
                    BuildTaskPhase::Running,
                    "Running",
                    &message,
                    task.generation,
                    now,
                );
                Evaluation {
                    status,
                    action: DesiredAction::None,
                    requeue_after: time_until_deadline(spec, started, now),
                }
            }
            ExecutionState::NotStarted => {
                if let Some(pod_name) = observed.pod_name {
                    status.pod_name = pod_name;
                }
                Evaluation {
                    status,
                    action: DesiredAction::None,
                    requeue_after: time_until_deadline(spec, started, now),
                }
            }
        }
    }
}

fn succeed(
    task: &TaskRef,
    mut status: BuildTaskStatus,
    observed: ExecutionObservation,
    now: DateTime<Utc>,
) -> Evaluation {
    status.phase = Some(BuildTaskPhase::Succeeded);
    status.end_time = Some(now);
    status.image_digest = observed.image_digest.unwrap_or_default();
    if let Some(pod_name) = observed.pod_name {
        status.pod_name = pod_name;
    }
    let message = format!("Execution unit {} completed", status.job_name);
    set_phase_conditions(
        &mut status,
        BuildTaskPhase::Succeeded,
        "Succeeded",
        &message,
        task.generation,
        now,
    );

    info!(
        "✅ Execution unit {} succeeded, digest {}",
        status.job_name, status.image_digest
    );

    Evaluation {
        status,
        action: DesiredAction::None,
        requeue_after: None,
    }
}

fn fail(task: &TaskRef, mut status: BuildTaskStatus, reason: &str, now: DateTime<Utc>) -> Evaluation {
    status.phase = Some(BuildTaskPhase::Failed);
    status.end_time = Some(now);
    status.image_digest.clear();
    let message = format!("Execution unit {} failed: {}", status.job_name, reason);
    set_phase_conditions(
        &mut status,
        BuildTaskPhase::Failed,
        reason,
        &message,
        task.generation,
        now,
    );

    warn!("❌ Execution unit {} failed: {}", status.job_name, reason);

    Evaluation {
        status,
        action: DesiredAction::None,
        requeue_after: None,
    }
}

fn retain(
    spec: &ValidatedSpec<'_>,
    status: BuildTaskStatus,
    job_missing: bool,
    now: DateTime<Utc>,
) -> Evaluation {
    if job_missing {
        return Evaluation {
            status,
            action: DesiredAction::None,
            requeue_after: None,
        };
    }

    if retention::is_eligible_for_deletion(spec.spec, &status, now) {
        info!("🗑️ Retention elapsed for execution unit {}", status.job_name);
        let job_name = status.job_name.clone();
        return Evaluation {
            status,
            action: DesiredAction::DeleteExecutionUnit(job_name),
            requeue_after: None,
        };
    }

    let requeue_after = retention::expires_at(spec.spec, &status)
        .and_then(|expiry| (expiry - now).to_std().ok());
    Evaluation {
        status,
        action: DesiredAction::None,
        requeue_after,
    }
}

fn time_until_deadline(
    spec: &ValidatedSpec<'_>,
    started: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<std::time::Duration> {
    let remaining = spec.spec.timeout_seconds? - (now - started).num_seconds();
    u64::try_from(remaining)
        .ok()
        .map(std::time::Duration::from_secs)
}
