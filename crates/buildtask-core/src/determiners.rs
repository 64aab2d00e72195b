use k8s_openapi::api::{batch::v1::Job, core::v1::Pod};
use kube::ResourceExt;

use crate::{
    job::BUILD_CONTAINER,
    models::{ExecutionObservation, ExecutionState},
};

/// Maps a Job and its Pods onto what the state machine needs to know.
pub fn determine_execution_observation(job: &Job, pods: &[Pod]) -> ExecutionObservation {
    let state = determine_execution_state(job, pods);
    let pod = determine_relevant_pod(pods);

    let mut observation = ExecutionObservation::new(job.name_any(), state);
    observation.pod_name = pod.and_then(|p| p.metadata.name.clone());

    if state == ExecutionState::Succeeded {
        observation.image_digest = pods.iter().find_map(build_digest);
    }
    if state == ExecutionState::Failed {
        observation.failure_reason = job_condition(job, &["Failed", "FailureTarget"])
            .flatten()
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
    }

    observation
}

pub fn determine_execution_state(job: &Job, pods: &[Pod]) -> ExecutionState {
    if job_condition(job, &["Complete", "SuccessCriteriaMet"]).is_some() {
        return ExecutionState::Succeeded;
    }

    if job_condition(job, &["Failed", "FailureTarget"]).is_some() {
        return ExecutionState::Failed;
    }

    let ready = job.status.as_ref().and_then(|s| s.ready).unwrap_or(0);
    if ready > 0 || pods.iter().any(|p| pod_phase(p) == Some("Running")) {
        return ExecutionState::Running;
    }

    ExecutionState::NotStarted
}

/// Prefers a running Pod, then a succeeded one, then the newest listed.
fn determine_relevant_pod(pods: &[Pod]) -> Option<&Pod> {
    pods.iter()
        .find(|p| pod_phase(p) == Some("Running"))
        .or_else(|| pods.iter().find(|p| pod_phase(p) == Some("Succeeded")))
        .or_else(|| pods.last())
}

/// Reason of the first True condition among `types`.
fn job_condition<'a>(job: &'a Job, types: &[&str]) -> Option<Option<&'a str>> {
    job.status
        .as_ref()?
        .conditions
        .as_ref()?
        .iter()
        .find(|c| types.contains(&c.type_.as_str()) && c.status == "True")
        .map(|c| c.reason.as_deref())
}

fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref()?.phase.as_deref()
}

/// The build script writes the pushed digest to its termination message.
fn build_digest(pod: &Pod) -> Option<String> {
    pod.status
        .as_ref()?
        .container_statuses
        .as_ref()?
        .iter()
        .filter(|c| c.name == BUILD_CONTAINER)
        .find_map(|c| c.state.as_ref()?.terminated.as_ref()?.message.as_deref())
        .and_then(normalize_digest)
}

/// Accepts `sha256:<hex>` or a bare hex digest.
fn normalize_digest(message: &str) -> Option<String> {
    let message = message.trim();
    let hex = message.strip_prefix("sha256:").unwrap_or(message);

    (!hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| format!("sha256:{}", hex))
}
