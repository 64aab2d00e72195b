use serde::Deserialize;

/// Settings the Job renderer needs beyond the BuildTask itself.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "buildah_image_default")]
    pub buildah_image: String,
    #[serde(default = "git_image_default")]
    pub git_image: String,
    #[serde(default = "s3_image_default")]
    pub s3_image: String,
    /// Used when the spec leaves `backoffLimit` unset.
    #[serde(default = "backoff_limit_default")]
    pub default_backoff_limit: i32,
    #[serde(default = "storage_driver_default")]
    pub default_storage_driver: String,
    /// uid/gid the build Pod runs as.
    #[serde(default = "run_as_user_default")]
    pub run_as_user: i64,
    /// Home of `run_as_user` in the buildah image; storage lives below it.
    #[serde(default = "build_home_default")]
    pub build_home: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            buildah_image: buildah_image_default(),
            git_image: git_image_default(),
            s3_image: s3_image_default(),
            default_backoff_limit: backoff_limit_default(),
            default_storage_driver: storage_driver_default(),
            run_as_user: run_as_user_default(),
            build_home: build_home_default(),
        }
    }
}

fn buildah_image_default() -> String {
    String::from("quay.io/buildah/stable:v1.37")
}

fn git_image_default() -> String {
    String::from("alpine/git:2.45.2")
}

fn s3_image_default() -> String {
    String::from("amazon/aws-cli:2.17.0")
}

fn backoff_limit_default() -> i32 {
    2
}

fn storage_driver_default() -> String {
    String::from("vfs")
}

fn run_as_user_default() -> i64 {
    1000
}

fn build_home_default() -> String {
    String::from("/home/build")
}
