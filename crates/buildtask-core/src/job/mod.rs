pub mod implementation;
pub mod scripts;

use crate::configs::RenderConfig;

pub const BUILD_CONTAINER: &str = "build";
pub const FETCH_CONTAINER: &str = "fetch-context";

pub(crate) const WORKSPACE_VOLUME: &str = "workspace";
pub(crate) const WORKSPACE_DIR: &str = "/workspace";
pub(crate) const FETCHED_SOURCE_DIR: &str = "/workspace/src";
pub(crate) const CONTEXT_VOLUME: &str = "context";
pub(crate) const PVC_CONTEXT_DIR: &str = "/workspace/context";
pub(crate) const GIT_SECRET_VOLUME: &str = "git-credentials";
pub(crate) const GIT_SECRET_DIR: &str = "/var/run/secrets/buildtask/git";
pub(crate) const S3_SECRET_VOLUME: &str = "s3-credentials";
pub(crate) const S3_SECRET_DIR: &str = "/var/run/secrets/buildtask/s3";
pub(crate) const REGISTRY_SECRET_VOLUME: &str = "registry-credentials";
pub(crate) const REGISTRY_SECRET_DIR: &str = "/var/run/secrets/buildtask/registry";
pub(crate) const STORAGE_VOLUME: &str = "containers-storage";

/// Turns a validated BuildTask into the batch/v1 Job that executes it.
#[derive(Clone, Debug, Default)]
pub struct JobRenderer {
    pub config: RenderConfig,
}

impl JobRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}
