pub mod conditions;
pub mod implementation;
pub mod retention;

use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use serde::Serialize;

use crate::{configs::RenderConfig, crds::BuildTaskStatus, job::JobRenderer};

/// Pure BuildTask state machine: `(spec, status, observation, now) -> Evaluation`.
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    pub renderer: JobRenderer,
}

impl Lifecycle {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            renderer: JobRenderer::new(config),
        }
    }
}

/// The only imperative steps the host is asked to perform.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum DesiredAction {
    None,
    CreateExecutionUnit(Box<Job>),
    DeleteExecutionUnit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: BuildTaskStatus,
    pub action: DesiredAction,
    /// When the host should evaluate again even without new events.
    pub requeue_after: Option<Duration>,
}

impl Evaluation {
    pub fn unchanged(prev: &BuildTaskStatus) -> Self {
        Self {
            status: prev.clone(),
            action: DesiredAction::None,
            requeue_after: None,
        }
    }
}
