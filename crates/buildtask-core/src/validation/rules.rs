use validator::{Validate, ValidationError as FieldError, ValidationErrors, ValidationErrorsKind};

use crate::{
    crds::{BuildContext, BuildContextType, BuildTaskSpec, BuildahSpec, DockerfileSource, DockerfileSourceType},
    validation::{Rule, Violation},
};

/// Exactly the payload selected by `context.type` is set.
pub fn check_context_union(context: &BuildContext) -> Option<Violation> {
    if context.source().is_some() {
        return None;
    }

    let message = match context.r#type {
        BuildContextType::Git => {
            "when context.type=Git, context.git must be set and pvc/s3 must be empty"
        }
        BuildContextType::Pvc => {
            "when context.type=PVC, context.pvc must be set and git/s3 must be empty"
        }
        BuildContextType::S3 => {
            "when context.type=S3, context.s3 must be set and git/pvc must be empty"
        }
    };

    Some(Violation::new("context", message, Rule::UnionMismatch))
}

/// Path needs a path and no inline content, Inline needs content. Absent is valid.
pub fn check_dockerfile_union(dockerfile: Option<&DockerfileSource>) -> Option<Violation> {
    let source = dockerfile?;
    if DockerfileSource::resolve(Some(source)).is_some() {
        return None;
    }

    let message = match source.r#type {
        DockerfileSourceType::Path => {
            "when dockerfile.type=Path, dockerfile.path must be non-empty and dockerfile.inline must be empty"
        }
        DockerfileSourceType::Inline => {
            "when dockerfile.type=Inline, dockerfile.inline must be non-empty"
        }
    };

    Some(Violation::new("dockerfile", message, Rule::UnionMismatch))
}

/// Non-empty required strings and integer minimums, as declared on the spec types.
pub fn check_field_constraints(spec: &BuildTaskSpec) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Err(errors) = spec.validate() {
        flatten(&errors, "", &mut violations);
    }

    violations
}

/// Privileged builds are not supported.
pub fn check_rootless(buildah: Option<&BuildahSpec>) -> Option<Violation> {
    match buildah.and_then(|b| b.rootless) {
        Some(false) => Some(Violation::new(
            "buildah.rootless",
            "buildah.rootless must be true; privileged mode is not supported",
            Rule::RootlessRequired,
        )),
        _ => None,
    }
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<Violation>) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &wire_name(field));

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| to_violation(&path, e)));
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn to_violation(path: &str, error: &FieldError) -> Violation {
    match error.code.as_ref() {
        "length" => Violation::new(path, "must not be empty", Rule::Required),
        "range" => {
            let min = error
                .params
                .get("min")
                .map(|v| v.to_string())
                .unwrap_or_else(|| String::from("?"));
            Violation::new(path, format!("must be >= {}", min), Rule::Minimum)
        }
        code => Violation::new(path, format!("failed constraint '{}'", code), Rule::Constraint),
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// `failed_jobs_ttl_seconds_after_finished` -> `failedJobsTTLSecondsAfterFinished`
fn wire_name(field: &str) -> String {
    let mut segments = field.split('_');
    let mut name = segments.next().unwrap_or_default().to_string();

    for segment in segments {
        match segment {
            "ttl" | "tls" | "url" => name.push_str(&segment.to_uppercase()),
            _ => {
                let mut chars = segment.chars();
                if let Some(first) = chars.next() {
                    name.extend(first.to_uppercase());
                    name.push_str(chars.as_str());
                }
            }
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name() {
        assert_eq!(wire_name("image"), "image");
        assert_eq!(wire_name("claim_name"), "claimName");
        assert_eq!(wire_name("timeoutSeconds"), "timeoutSeconds");
        assert_eq!(
            wire_name("failed_jobs_ttl_seconds_after_finished"),
            "failedJobsTTLSecondsAfterFinished"
        );
    }

    #[test]
    fn test_check_rootless() {
        assert!(check_rootless(None).is_none());

        let privileged = BuildahSpec {
            rootless: Some(false),
            ..Default::default()
        };
        let violation = check_rootless(Some(&privileged)).unwrap();
        assert_eq!(violation.rule, Rule::RootlessRequired);
        assert_eq!(violation.field, "buildah.rootless");
    }

    #[test]
    fn test_absent_dockerfile_is_valid() {
        assert!(check_dockerfile_union(None).is_none());
    }
}
