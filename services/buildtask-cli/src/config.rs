use std::path::Path;

use buildtask_core::configs::RenderConfig;
use config::{ConfigBuilder, ConfigError, Environment, File, builder::AsyncState};
use factory::factories::observability::ObservabilityConfig;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Optional JSON file, overridden by `BUILDTASK_<SECTION>__<KEY>` variables.
    pub async fn init(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::<AsyncState>::default();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix("BUILDTASK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .await?;

        cfg.try_deserialize()
    }
}
