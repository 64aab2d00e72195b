use buildtask_core::{crds::BuildTask, validation::validate};
use kube::ResourceExt;
use tracing::info;

use crate::error::AppError;

/// Lists every violation; errors when there is at least one.
pub fn cmd_validate(task: &BuildTask) -> Result<String, AppError> {
    let violations = validate(&task.spec);
    let name = task.name_any();

    if violations.is_empty() {
        info!("✅ BuildTask {} is valid", name);
        return Ok(format!("{} is valid\n", name));
    }

    Err(AppError::InvalidManifest {
        name,
        violations: violations.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, parse_manifest};

    #[test]
    fn test_valid_manifest() {
        let task = parse_manifest(fixtures::GIT_TASK).unwrap();

        assert_eq!(cmd_validate(&task).unwrap(), "web is valid\n");
    }

    #[test]
    fn test_invalid_manifest_counts_every_violation() {
        let task = parse_manifest(fixtures::PRIVILEGED_TASK).unwrap();

        match cmd_validate(&task) {
            Err(err) => {
                let report = err.to_string();
                assert!(report.starts_with("legacy has 4 violation(s):\n"));
                assert!(report.contains("image: "));
                assert!(report.contains("(RootlessRequired)"));

                match err {
                    AppError::InvalidManifest { name, violations } => {
                        assert_eq!(name, "legacy");
                        // context union, image, timeoutSeconds, rootless
                        assert_eq!(violations.len(), 4);
                    }
                    other => panic!("expected invalid manifest, got {:?}", other),
                }
            }
            Ok(output) => panic!("expected invalid manifest, got {:?}", output),
        }
    }
}
