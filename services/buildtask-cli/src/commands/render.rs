use buildtask_core::{
    crds::BuildTask,
    formatters::format_job_name,
    job::JobRenderer,
    models::TaskRef,
    validation::validate_spec,
};
use chrono::Utc;

use crate::error::AppError;

/// Renders the tracked Job, or the one a trigger right now would create, as YAML.
pub fn cmd_render(renderer: &JobRenderer, task: &BuildTask) -> Result<String, AppError> {
    let validated = validate_spec(&task.spec)?;
    let task_ref = TaskRef::from_resource(task);
    let job_name = task
        .status
        .as_ref()
        .map(|status| status.job_name.clone())
        .filter(|job_name| !job_name.is_empty())
        .unwrap_or_else(|| format_job_name(&task_ref.name, validated.trigger_nonce(), Utc::now()));

    let job = renderer.render(&task_ref, &validated, &job_name);

    Ok(serde_yaml::to_string(&job)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, parse_manifest};

    #[test]
    fn test_render_git_manifest() {
        let task = parse_manifest(fixtures::GIT_TASK).unwrap();

        let yaml = cmd_render(&JobRenderer::default(), &task).unwrap();

        assert!(yaml.contains("kind: Job"));
        assert!(yaml.contains("namespace: team-a"));
        assert!(yaml.contains("activeDeadlineSeconds: 1800"));
        assert!(yaml.contains("VERSION=1.2.3"));
        assert!(yaml.contains("registry-credentials"));
    }

    #[test]
    fn test_render_refuses_invalid_manifest() {
        let task = parse_manifest(fixtures::PRIVILEGED_TASK).unwrap();

        assert!(matches!(
            cmd_render(&JobRenderer::default(), &task),
            Err(AppError::ValidationError(_))
        ));
    }
}
