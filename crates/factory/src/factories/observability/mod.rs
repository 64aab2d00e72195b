pub mod error;
pub mod implementation;

use opentelemetry_sdk::{metrics::SdkMeterProvider, trace::SdkTracerProvider};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ObservabilityConfig {
    /// OTLP/gRPC collector; logs only go to stderr when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
    #[serde(default)]
    pub rust_log: Option<String>,
    /// `json` (default) or `pretty`
    #[serde(default)]
    pub log_format: Option<String>,
    #[serde(default)]
    pub tracing_level: Option<String>,
    #[serde(default)]
    pub with_file: Option<bool>,
    #[serde(default)]
    pub with_line_number: Option<bool>,
}

pub struct Observability {
    pub tracer_provider: Option<SdkTracerProvider>,
    pub meter_provider: Option<SdkMeterProvider>,
}
