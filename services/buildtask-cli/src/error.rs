use buildtask_core::error::ValidationError;
use factory::factories::observability::error::ObservabilityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error, {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error, {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serde json error, {0}")]
    SerdejsonError(#[from] serde_json::Error),

    #[error("Config error, {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("{0}")]
    ValidationError(#[from] ValidationError),

    #[error("Observability error, {0}")]
    ObservabilityError(#[from] ObservabilityError),

    #[error("Invalid timestamp {value}: {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("{name} has {} violation(s):\n{}", .violations.len(), .violations.join("\n"))]
    InvalidManifest {
        name: String,
        violations: Vec<String>,
    },
}
