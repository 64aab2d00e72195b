use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        batch::v1::{Job, JobSpec},
        core::v1::{
            Container, EmptyDirVolumeSource, EnvVar, PersistentVolumeClaimVolumeSource,
            PodSecurityContext, PodSpec, PodTemplateSpec, ResourceRequirements,
            SecretVolumeSource, SecurityContext, Volume, VolumeMount,
        },
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::OwnerReference},
};
use kube::{Resource, api::ObjectMeta};
use tracing::debug;

use crate::{
    crds::{BuildResources, BuildTask, BuildTaskSpec, GitContext, S3Context},
    formatters::format_job_labels,
    job::{
        BUILD_CONTAINER, CONTEXT_VOLUME, FETCH_CONTAINER, FETCHED_SOURCE_DIR, GIT_SECRET_DIR,
        GIT_SECRET_VOLUME, JobRenderer, PVC_CONTEXT_DIR, REGISTRY_SECRET_DIR,
        REGISTRY_SECRET_VOLUME, S3_SECRET_DIR, S3_SECRET_VOLUME, STORAGE_VOLUME,
        WORKSPACE_DIR, WORKSPACE_VOLUME, scripts,
    },
    models::{ContextSource, DockerfileSpec, TaskRef},
    validation::ValidatedSpec,
};

impl JobRenderer {
    #[tracing::instrument(
        name = "job_renderer.render",
        skip_all,
        fields(task = %task.name, namespace = %task.namespace, job_name = %job_name)
    )]
    pub fn render(&self, task: &TaskRef, spec: &ValidatedSpec<'_>, job_name: &str) -> Job {
        let labels = format_job_labels(&task.name, spec.trigger_nonce());

        let mut volumes = vec![empty_dir_volume(WORKSPACE_VOLUME)];
        let mut init_containers = Vec::new();
        let mut build_mounts = vec![volume_mount(WORKSPACE_VOLUME, WORKSPACE_DIR, false)];

        let context_dir = match spec.context {
            ContextSource::Git(git) => {
                if let Some(secret) = &git.secret_ref {
                    volumes.push(secret_volume(GIT_SECRET_VOLUME, &secret.name));
                }
                init_containers.push(self.git_fetch_container(git));
                join_dir(FETCHED_SOURCE_DIR, git.sub_path.as_deref())
            }
            ContextSource::S3(s3) => {
                if let Some(secret) = &s3.secret_ref {
                    volumes.push(secret_volume(S3_SECRET_VOLUME, &secret.name));
                }
                init_containers.push(self.s3_fetch_container(s3));
                FETCHED_SOURCE_DIR.to_string()
            }
            ContextSource::Pvc(pvc) => {
                volumes.push(pvc_volume(CONTEXT_VOLUME, &pvc.claim_name, true));
                build_mounts.push(volume_mount(CONTEXT_VOLUME, PVC_CONTEXT_DIR, true));
                join_dir(PVC_CONTEXT_DIR, Some(&pvc.path))
            }
        };

        if let Some(secret) = &spec.spec.push_secret_ref {
            volumes.push(secret_volume(REGISTRY_SECRET_VOLUME, &secret.name));
            build_mounts.push(volume_mount(
                REGISTRY_SECRET_VOLUME,
                REGISTRY_SECRET_DIR,
                true,
            ));
        }

        let storage_dir = format!(
            "{}/.local/share/containers",
            self.config.build_home.trim_end_matches('/')
        );
        let mut storage_mount = volume_mount(STORAGE_VOLUME, &storage_dir, false);
        match cache_claim(spec.spec) {
            Some((claim_name, sub_path)) => {
                volumes.push(pvc_volume(STORAGE_VOLUME, claim_name, false));
                storage_mount.sub_path = sub_path.map(ToString::to_string);
            }
            None => volumes.push(empty_dir_volume(STORAGE_VOLUME)),
        }
        build_mounts.push(storage_mount);

        let build = Container {
            name: BUILD_CONTAINER.to_string(),
            image: Some(self.config.buildah_image.clone()),
            command: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                scripts::BUILD.to_string(),
                "buildtask".to_string(),
            ]),
            args: Some(build_arg_flags(&spec.spec.build_args)),
            env: Some(self.build_env(spec, &context_dir)),
            volume_mounts: Some(build_mounts),
            resources: spec.spec.resources.as_ref().map(resource_requirements),
            security_context: Some(self.rootless_security_context()),
            termination_message_policy: Some("File".to_string()),
            ..Default::default()
        };

        debug!(
            init_containers = init_containers.len(),
            volumes = volumes.len(),
            "Rendered build pod"
        );

        let pod_spec = PodSpec {
            init_containers: (!init_containers.is_empty()).then_some(init_containers),
            containers: vec![build],
            volumes: Some(volumes),
            restart_policy: Some("Never".to_string()),
            service_account_name: spec.spec.service_account_name.clone(),
            security_context: Some(PodSecurityContext {
                run_as_non_root: Some(true),
                run_as_user: Some(self.config.run_as_user),
                run_as_group: Some(self.config.run_as_user),
                fs_group: Some(self.config.run_as_user),
                ..Default::default()
            }),
            ..Default::default()
        };

        Job {
            metadata: ObjectMeta {
                name: Some(job_name.to_string()),
                namespace: Some(task.namespace.clone()),
                labels: Some(labels.clone()),
                owner_references: owner_reference(task).map(|o| vec![o]),
                ..Default::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(
                    spec.spec
                        .backoff_limit
                        .unwrap_or(self.config.default_backoff_limit),
                ),
                active_deadline_seconds: spec.spec.timeout_seconds,
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(pod_spec),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn git_fetch_container(&self, git: &GitContext) -> Container {
        let mut env = vec![env_var("GIT_URL", &git.url)];
        if let Some(revision) = git.revision.as_deref().filter(|r| !r.is_empty()) {
            env.push(env_var("GIT_REVISION", revision));
        }
        if let Some(depth) = git.depth {
            env.push(env_var("GIT_DEPTH", &depth.to_string()));
        }

        let mut mounts = vec![volume_mount(WORKSPACE_VOLUME, WORKSPACE_DIR, false)];
        if git.secret_ref.is_some() {
            mounts.push(volume_mount(GIT_SECRET_VOLUME, GIT_SECRET_DIR, true));
            env.push(env_var(
                "GIT_SSH_COMMAND",
                &format!(
                    "ssh -i {}/ssh-privatekey -o StrictHostKeyChecking=accept-new",
                    GIT_SECRET_DIR
                ),
            ));
        }
        env.push(env_var("HOME", WORKSPACE_DIR));

        self.fetch_container(&self.config.git_image, scripts::GIT_FETCH, env, mounts)
    }

    fn s3_fetch_container(&self, s3: &S3Context) -> Container {
        let mut env = vec![env_var("S3_BUCKET", &s3.bucket), env_var("S3_KEY", &s3.key)];
        if let Some(endpoint) = s3.endpoint.as_deref().filter(|e| !e.is_empty()) {
            env.push(env_var("S3_ENDPOINT", endpoint));
        }
        if let Some(region) = s3.region.as_deref().filter(|r| !r.is_empty()) {
            env.push(env_var("AWS_DEFAULT_REGION", region));
        }
        env.push(env_var("HOME", WORKSPACE_DIR));

        let mut mounts = vec![volume_mount(WORKSPACE_VOLUME, WORKSPACE_DIR, false)];
        if s3.secret_ref.is_some() {
            mounts.push(volume_mount(S3_SECRET_VOLUME, S3_SECRET_DIR, true));
        }

        self.fetch_container(&self.config.s3_image, scripts::S3_FETCH, env, mounts)
    }

    fn fetch_container(
        &self,
        image: &str,
        script: &str,
        env: Vec<EnvVar>,
        volume_mounts: Vec<VolumeMount>,
    ) -> Container {
        Container {
            name: FETCH_CONTAINER.to_string(),
            image: Some(image.to_string()),
            command: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                script.to_string(),
            ]),
            env: Some(env),
            volume_mounts: Some(volume_mounts),
            security_context: Some(self.rootless_security_context()),
            ..Default::default()
        }
    }

    fn build_env(&self, spec: &ValidatedSpec<'_>, context_dir: &str) -> Vec<EnvVar> {
        let output = spec.spec.output.as_ref();
        let push = output.and_then(|o| o.push).unwrap_or(true);
        let tls_verify = !output
            .map(|o| o.skip_tls_verify.unwrap_or(false) || o.insecure.unwrap_or(false))
            .unwrap_or(false);
        let extra_images = output.map(|o| o.images.join(" ")).unwrap_or_default();
        let buildah = spec.spec.buildah.as_ref();
        let storage_driver = buildah
            .and_then(|b| b.storage_driver.as_deref())
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.config.default_storage_driver);

        let mut env = vec![
            env_var("BUILDTASK_CONTEXT_DIR", context_dir),
            env_var("BUILDTASK_IMAGE", &spec.spec.image),
            env_var("BUILDTASK_EXTRA_IMAGES", &extra_images),
            env_var("BUILDTASK_PUSH", &push.to_string()),
            env_var("BUILDTASK_TLS_VERIFY", &tls_verify.to_string()),
            env_var("BUILDTASK_STORAGE_DRIVER", storage_driver),
            env_var("BUILDAH_ISOLATION", "chroot"),
            env_var("HOME", &self.config.build_home),
        ];

        match spec.dockerfile {
            DockerfileSpec::Path(path) => env.push(env_var("BUILDTASK_DOCKERFILE", path)),
            DockerfileSpec::Inline(content) => {
                env.push(env_var("BUILDTASK_DOCKERFILE_INLINE", content))
            }
        }

        if spec.spec.push_secret_ref.is_some() {
            env.push(env_var(
                "REGISTRY_AUTH_FILE",
                &format!("{}/.dockerconfigjson", REGISTRY_SECRET_DIR),
            ));
        }

        if let Some(buildah) = buildah {
            env.extend(buildah.env.iter().map(|e| EnvVar {
                name: e.name.clone(),
                value: e.value.clone(),
                ..Default::default()
            }));
        }

        env
    }

    fn rootless_security_context(&self) -> SecurityContext {
        SecurityContext {
            privileged: Some(false),
            allow_privilege_escalation: Some(false),
            run_as_non_root: Some(true),
            run_as_user: Some(self.config.run_as_user),
            ..Default::default()
        }
    }
}

fn owner_reference(task: &TaskRef) -> Option<OwnerReference> {
    let uid = task.uid.clone()?;

    Some(OwnerReference {
        api_version: BuildTask::api_version(&()).to_string(),
        kind: BuildTask::kind(&()).to_string(),
        name: task.name.clone(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn cache_claim(spec: &BuildTaskSpec) -> Option<(&str, Option<&str>)> {
    let cache = spec.cache.as_ref()?;
    if !cache.enabled.unwrap_or(false) {
        return None;
    }

    let claim_name = cache.pvc_name.as_deref().filter(|n| !n.is_empty())?;
    let sub_path = cache.sub_path.as_deref().filter(|p| !p.is_empty());
    Some((claim_name, sub_path))
}

fn build_arg_flags(build_args: &BTreeMap<String, String>) -> Vec<String> {
    build_args
        .iter()
        .flat_map(|(key, value)| ["--build-arg".to_string(), format!("{}={}", key, value)])
        .collect()
}

fn resource_requirements(resources: &BuildResources) -> ResourceRequirements {
    let quantities = |map: &Option<BTreeMap<String, String>>| {
        map.as_ref().map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), Quantity(v.clone())))
                .collect::<BTreeMap<String, Quantity>>()
        })
    };

    ResourceRequirements {
        requests: quantities(&resources.requests),
        limits: quantities(&resources.limits),
        ..Default::default()
    }
}

fn join_dir(base: &str, sub_path: Option<&str>) -> String {
    match sub_path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(sub_path) => format!("{}/{}", base, sub_path),
        None => base.to_string(),
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn volume_mount(name: &str, mount_path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: read_only.then_some(true),
        ..Default::default()
    }
}

fn empty_dir_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

fn secret_volume(name: &str, secret_name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            default_mode: Some(0o440),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pvc_volume(name: &str, claim_name: &str, read_only: bool) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.to_string(),
            read_only: read_only.then_some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}
