use buildtask_core::crds::BuildTask;
use kube::CustomResourceExt;

use crate::error::AppError;

pub fn cmd_crd() -> Result<String, AppError> {
    Ok(serde_yaml::to_string(&BuildTask::crd())?)
}
