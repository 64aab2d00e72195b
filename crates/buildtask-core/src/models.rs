use kube::ResourceExt;
use serde::{Deserialize, Serialize};

use crate::crds::{BuildTask, GitContext, PvcContext, S3Context};

// ---------------------------------------------
// TASK IDENTITY
// ---------------------------------------------

/// Identity of a BuildTask as handed over by the hosting store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    pub generation: i64,
}

impl TaskRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
            generation: 0,
        }
    }

    pub fn from_resource(task: &BuildTask) -> Self {
        Self {
            name: task.name_any(),
            namespace: task.namespace().unwrap_or_else(|| String::from("default")),
            uid: task.uid(),
            generation: task.metadata.generation.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------
// EXECUTION OBSERVATION
// ---------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// What the job runtime reports about one execution unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionObservation {
    pub job_name: String,
    pub state: ExecutionState,
    #[serde(default)]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub image_digest: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl ExecutionObservation {
    pub fn new(job_name: impl Into<String>, state: ExecutionState) -> Self {
        Self {
            job_name: job_name.into(),
            state,
            pod_name: None,
            image_digest: None,
            failure_reason: None,
        }
    }

    pub fn with_pod(mut self, pod_name: impl Into<String>) -> Self {
        self.pod_name = Some(pod_name.into());
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.image_digest = Some(digest.into());
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

// ---------------------------------------------
// RESOLVED UNIONS
// ---------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextSource<'a> {
    Git(&'a GitContext),
    Pvc(&'a PvcContext),
    S3(&'a S3Context),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerfileSpec<'a> {
    Path(&'a str),
    Inline(&'a str),
}
