pub mod rules;

use serde::Serialize;

use crate::{
    crds::{BuildContext, BuildContextType, BuildTaskSpec, DockerfileSource, DockerfileSourceType},
    error::ValidationError,
    models::{ContextSource, DockerfileSpec},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    /// A tagged union does not carry exactly the payload its tag selects.
    UnionMismatch,
    /// A required string is empty.
    Required,
    /// A bounded integer is below its minimum.
    Minimum,
    /// `buildah.rootless` is explicitly false.
    RootlessRequired,
    /// Any other field constraint.
    Constraint,
}

/// One field-addressed problem found in a spec.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Wire path relative to `spec`, e.g. `context.git.url`.
    pub field: String,
    pub message: String,
    pub rule: Rule,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>, rule: Rule) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule,
        }
    }
}

/// A spec that passed [`validate`], with its unions resolved.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedSpec<'a> {
    pub spec: &'a BuildTaskSpec,
    pub context: ContextSource<'a>,
    pub dockerfile: DockerfileSpec<'a>,
}

impl ValidatedSpec<'_> {
    pub fn trigger_nonce(&self) -> &str {
        self.spec
            .trigger
            .as_ref()
            .and_then(|t| t.manual.as_ref())
            .map(|m| m.nonce.as_str())
            .unwrap_or_default()
    }
}

/// Checks every rule and returns all violations, in rule order.
pub fn validate(spec: &BuildTaskSpec) -> Vec<Violation> {
    let mut violations = Vec::new();

    violations.extend(rules::check_context_union(&spec.context));
    violations.extend(rules::check_dockerfile_union(spec.dockerfile.as_ref()));

    let mut constraints = rules::check_field_constraints(spec);
    constraints.sort_by(|a, b| a.rule.cmp(&b.rule).then_with(|| a.field.cmp(&b.field)));
    violations.extend(constraints);

    violations.extend(rules::check_rootless(spec.buildah.as_ref()));

    violations
}

pub fn validate_spec(spec: &BuildTaskSpec) -> Result<ValidatedSpec<'_>, ValidationError> {
    let violations = validate(spec);

    match (
        spec.context.source(),
        DockerfileSource::resolve(spec.dockerfile.as_ref()),
    ) {
        (Some(context), Some(dockerfile)) if violations.is_empty() => Ok(ValidatedSpec {
            spec,
            context,
            dockerfile,
        }),
        _ => Err(ValidationError::new(violations)),
    }
}

impl BuildContext {
    /// The payload selected by `type`, if it is the only one set.
    pub fn source(&self) -> Option<ContextSource<'_>> {
        match (self.r#type, &self.git, &self.pvc, &self.s3) {
            (BuildContextType::Git, Some(git), None, None) => Some(ContextSource::Git(git)),
            (BuildContextType::Pvc, None, Some(pvc), None) => Some(ContextSource::Pvc(pvc)),
            (BuildContextType::S3, None, None, Some(s3)) => Some(ContextSource::S3(s3)),
            _ => None,
        }
    }
}

impl DockerfileSource {
    pub fn resolve(source: Option<&Self>) -> Option<DockerfileSpec<'_>> {
        let Some(source) = source else {
            return Some(DockerfileSpec::Path("Dockerfile"));
        };

        match source.r#type {
            DockerfileSourceType::Path if !source.path.is_empty() && source.inline.is_empty() => {
                Some(DockerfileSpec::Path(&source.path))
            }
            DockerfileSourceType::Inline if !source.inline.is_empty() => {
                Some(DockerfileSpec::Inline(&source.inline))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{
        BuildahSpec, GitContext, PvcContext, RetentionSpec, S3Context,
    };

    fn git_spec() -> BuildTaskSpec {
        BuildTaskSpec {
            image: "registry.local/team/app:v1".to_string(),
            context: BuildContext {
                r#type: BuildContextType::Git,
                git: Some(GitContext {
                    url: "https://x/y.git".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_git_context_is_valid() {
        let spec = git_spec();

        assert!(validate(&spec).is_empty());

        let validated = validate_spec(&spec).unwrap();
        assert!(matches!(validated.context, ContextSource::Git(g) if g.url == "https://x/y.git"));
        assert_eq!(validated.dockerfile, DockerfileSpec::Path("Dockerfile"));
    }

    #[test]
    fn test_extra_context_payload_is_a_single_union_mismatch() {
        let mut spec = git_spec();
        spec.context.pvc = Some(PvcContext {
            claim_name: "sources".to_string(),
            path: "/".to_string(),
        });

        let violations = validate(&spec);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::UnionMismatch);
        assert_eq!(violations[0].field, "context");
    }

    #[test]
    fn test_missing_payload_for_tag() {
        let mut spec = git_spec();
        spec.context.r#type = BuildContextType::S3;

        let violations = validate(&spec);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "context");
        assert!(violations[0].message.contains("context.type=S3"));
    }

    #[test]
    fn test_dockerfile_union() {
        let mut spec = git_spec();
        spec.dockerfile = Some(DockerfileSource {
            r#type: DockerfileSourceType::Path,
            path: "Containerfile".to_string(),
            inline: "FROM scratch".to_string(),
        });

        let violations = validate(&spec);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "dockerfile");

        spec.dockerfile = Some(DockerfileSource {
            r#type: DockerfileSourceType::Inline,
            path: "Dockerfile".to_string(),
            inline: "FROM alpine:3.20".to_string(),
        });
        let validated = validate_spec(&spec).unwrap();
        assert_eq!(validated.dockerfile, DockerfileSpec::Inline("FROM alpine:3.20"));

        spec.dockerfile = Some(DockerfileSource {
            r#type: DockerfileSourceType::Inline,
            path: "Dockerfile".to_string(),
            inline: String::new(),
        });
        assert_eq!(validate(&spec)[0].rule, Rule::UnionMismatch);
    }

    #[test]
    fn test_every_rule_is_reported_in_order() {
        let mut spec = git_spec();
        spec.image = String::new();
        spec.context.s3 = Some(S3Context {
            bucket: String::new(),
            key: "ctx.tar.gz".to_string(),
            ..Default::default()
        });
        if let Some(git) = spec.context.git.as_mut() {
            git.depth = Some(0);
        }
        spec.timeout_seconds = Some(0);
        spec.backoff_limit = Some(-1);
        spec.retention = Some(RetentionSpec {
            successful_jobs_ttl_seconds_after_finished: Some(-5),
            failed_jobs_ttl_seconds_after_finished: None,
        });
        spec.buildah = Some(BuildahSpec {
            rootless: Some(false),
            ..Default::default()
        });

        let violations = validate(&spec);
        let fields: Vec<(&str, Rule)> = violations
            .iter()
            .map(|v| (v.field.as_str(), v.rule))
            .collect();

        assert_eq!(
            fields,
            vec![
                ("context", Rule::UnionMismatch),
                ("context.s3.bucket", Rule::Required),
                ("image", Rule::Required),
                ("backoffLimit", Rule::Minimum),
                ("context.git.depth", Rule::Minimum),
                ("retention.successfulJobsTTLSecondsAfterFinished", Rule::Minimum),
                ("timeoutSeconds", Rule::Minimum),
                ("buildah.rootless", Rule::RootlessRequired),
            ]
        );

        let err = validate_spec(&spec).unwrap_err();
        assert_eq!(err.violations, violations);
        assert!(err.to_string().contains("buildah.rootless"));
    }

    #[test]
    fn test_rootless_true_or_absent_is_accepted() {
        let mut spec = git_spec();
        spec.buildah = Some(BuildahSpec::default());
        assert!(validate(&spec).is_empty());

        spec.buildah = Some(BuildahSpec {
            rootless: Some(true),
            ..Default::default()
        });
        assert!(validate(&spec).is_empty());
    }
}
