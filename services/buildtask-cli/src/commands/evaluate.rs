use std::path::Path;

use buildtask_core::{
    crds::{BuildTask, BuildTaskStatus},
    error::ObservationError,
    lifecycle::{DesiredAction, Lifecycle},
    models::ExecutionObservation,
    reconciler::Reconciler,
    traits::{ExecutionObserver, FixedClock},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;

/// Replays an observation captured from the cluster (or none at all).
pub struct RecordedObserver {
    pub observation: Option<ExecutionObservation>,
}

impl ExecutionObserver for RecordedObserver {
    fn observe(
        &self,
        _namespace: &str,
        _job_name: &str,
    ) -> Result<Option<ExecutionObservation>, ObservationError> {
        Ok(self.observation.clone())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutput {
    pub status: BuildTaskStatus,
    pub action: DesiredAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requeue_after_seconds: Option<u64>,
}

pub fn read_observation(path: &Path) -> Result<ExecutionObservation, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

pub fn parse_now(value: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    match value {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| AppError::InvalidTimestamp {
                value: value.to_string(),
                source,
            }),
        None => Ok(Utc::now()),
    }
}

pub fn cmd_evaluate(
    lifecycle: Lifecycle,
    task: &BuildTask,
    observation: Option<ExecutionObservation>,
    now: DateTime<Utc>,
) -> Result<EvaluationOutput, AppError> {
    let reconciler =
        Reconciler::with_clock(lifecycle, RecordedObserver { observation }, FixedClock(now));

    let evaluation = reconciler.reconcile_resource(task);
    info!(
        phase = ?evaluation.status.phase,
        action = %evaluation.action,
        "📊 Evaluated BuildTask"
    );

    Ok(EvaluationOutput {
        status: evaluation.status,
        action: evaluation.action,
        requeue_after_seconds: evaluation.requeue_after.map(|d| d.as_secs()),
    })
}
