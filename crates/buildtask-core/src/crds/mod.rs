use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

// -----------------------------------------------------------------------------
// BuildTask Resource
// -----------------------------------------------------------------------------

/// Desired state of a BuildTask: build `context` with `dockerfile` and push `image`.
#[derive(CustomResource, Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
#[kube(
    group = "buildtask.io",
    version = "v1alpha1",
    kind = "BuildTask",
    plural = "buildtasks",
    shortname = "bt",
    namespaced,
    status = "BuildTaskStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Job","type":"string","jsonPath":".status.jobName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BuildTaskSpec {
    /// Primary target image reference (e.g. registry/repo:tag).
    #[validate(length(min = 1))]
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<BuildOutput>,

    #[validate(nested)]
    pub context: BuildContext,

    /// Defaults to `{type: Path, path: Dockerfile}` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<DockerfileSource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,

    /// Registry credentials (kubernetes.io/dockerconfigjson) in the task namespace.
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_secret_ref: Option<LocalSecretReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<BuildResources>,

    /// Max build duration, mapped to the Job's activeDeadlineSeconds.
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,

    #[validate(range(min = 0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildah: Option<BuildahSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSpec>,
}

// -----------------------------------------------------------------------------
// Context
// -----------------------------------------------------------------------------

#[derive(Deserialize, Serialize, JsonSchema, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum BuildContextType {
    #[default]
    Git,
    #[serde(rename = "PVC")]
    Pvc,
    S3,
}

/// Source of the build context. Exactly one of git/pvc/s3 must be set, according to `type`.
#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    #[serde(rename = "type")]
    pub r#type: BuildContextType,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitContext>,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc: Option<PvcContext>,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Context>,
}

#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitContext {
    #[validate(length(min = 1))]
    pub url: String,

    /// Branch, tag, or commit sha.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Path inside the repository used as the build context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalSecretReference>,

    /// Shallow clone depth.
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i32>,
}

#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcContext {
    #[validate(length(min = 1))]
    pub claim_name: String,

    #[serde(default = "pvc_path_default")]
    pub path: String,
}

fn pvc_path_default() -> String {
    String::from("/")
}

/// S3/OSS object (e.g. a tarball) holding the build context.
#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3Context {
    #[validate(length(min = 1))]
    pub bucket: String,

    #[validate(length(min = 1))]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalSecretReference>,
}

/// References a Secret in the same namespace as the BuildTask.
#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct LocalSecretReference {
    #[validate(length(min = 1))]
    pub name: String,
}

// -----------------------------------------------------------------------------
// Dockerfile
// -----------------------------------------------------------------------------

#[derive(Deserialize, Serialize, JsonSchema, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum DockerfileSourceType {
    #[default]
    Path,
    Inline,
}

#[derive(Deserialize, Serialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DockerfileSource {
    #[serde(rename = "type")]
    pub r#type: DockerfileSourceType,

    /// Path within the build context (type=Path).
    #[serde(default = "dockerfile_path_default")]
    pub path: String,

    /// Dockerfile content (type=Inline).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub inline: String,
}

fn dockerfile_path_default() -> String {
    String::from("Dockerfile")
}

// -----------------------------------------------------------------------------
// Output, resources and runtime policy
// -----------------------------------------------------------------------------

#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    /// Push built image(s) to the registry. Defaults to true.
    #[schemars(extend("default" = true))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,

    /// Additional image references (tags) to push besides `spec.image`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(
        default,
        rename = "skipTLSVerify",
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_tls_verify: Option<bool>,

    /// Allow a plain HTTP registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
}

/// Compute requests/limits of the build container, as resource quantities.
#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct BuildResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<BTreeMap<String, String>>,
}

/// TTL policy for finished Jobs, measured from `status.endTime`.
#[derive(Deserialize, Serialize, Validate, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct RetentionSpec {
    #[validate(range(min = 0))]
    #[serde(
        default,
        rename = "successfulJobsTTLSecondsAfterFinished",
        skip_serializing_if = "Option::is_none"
    )]
    pub successful_jobs_ttl_seconds_after_finished: Option<i32>,

    #[validate(range(min = 0))]
    #[serde(
        default,
        rename = "failedJobsTTLSecondsAfterFinished",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_jobs_ttl_seconds_after_finished: Option<i32>,
}

#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Existing PVC holding the buildah storage (same namespace).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// Buildah runtime options. Rootless only, privileged mode is not exposed.
#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildahSpec {
    /// Must be true (or unset) for this controller.
    #[schemars(extend("default" = true))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootless: Option<bool>,

    /// containers/storage driver (overlay, vfs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_driver: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<BuildahEnvVar>,
}

#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct BuildahEnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

// -----------------------------------------------------------------------------
// Trigger
// -----------------------------------------------------------------------------

#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct TriggerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualTrigger>,
}

/// Changing `nonce` requests a new build (unix timestamp, git sha, UUID...).
#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
pub struct ManualTrigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nonce: String,
}

// -----------------------------------------------------------------------------
// Status
// -----------------------------------------------------------------------------

#[derive(Deserialize, Serialize, JsonSchema, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum BuildTaskPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Deserialize, Serialize, JsonSchema, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildTaskStatus {
    /// Unique by `type`, kept sorted by `type`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<BuildTaskPhase>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_name: String,

    /// Latest Pod of the Job, best-effort (may change across retries).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Resulting image digest (sha256:...), set on success only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_digest: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_trigger_nonce: String,

    #[serde(default, rename = "logURL", skip_serializing_if = "String::is_empty")]
    pub log_url: String,
}

#[derive(Deserialize, Serialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Standard Kubernetes condition (metav1.Condition wire format).
#[derive(Deserialize, Serialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    pub last_transition_time: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub message: String,
}
