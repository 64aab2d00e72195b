pub mod crd;
pub mod evaluate;
pub mod render;
pub mod validate;

use std::path::Path;

use buildtask_core::crds::BuildTask;

use crate::error::AppError;

/// Reads a BuildTask manifest (YAML or JSON).
pub fn read_manifest(path: &Path) -> Result<BuildTask, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_manifest(&raw)
}

pub fn parse_manifest(raw: &str) -> Result<BuildTask, AppError> {
    Ok(serde_yaml::from_str(raw)?)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const GIT_TASK: &str = include_str!("../../manifests/git-buildtask.yaml");
    pub const PRIVILEGED_TASK: &str = include_str!("../../manifests/privileged-buildtask.yaml");
}
