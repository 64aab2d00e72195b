use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{SCHEMA_URL, attribute::SERVICE_VERSION};
use time::macros::format_description;
use tonic::transport::ClientTlsConfig;
use tracing::Level;
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::{
    EnvFilter, Layer, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::factories::observability::{
    Observability, ObservabilityConfig, error::ObservabilityError,
};

impl Drop for Observability {
    fn drop(&mut self) {
        if let Some(Err(err)) = self.tracer_provider.as_ref().map(|p| p.shutdown()) {
            eprintln!("{err:?}");
        }
        if let Some(Err(err)) = self.meter_provider.as_ref().map(|p| p.shutdown()) {
            eprintln!("{err:?}");
        }
    }
}

impl Observability {
    /// Installs the global subscriber. Keep the returned value alive: dropping it
    /// flushes and shuts down the OTLP pipelines.
    pub async fn init(
        config: &ObservabilityConfig,
        cargo_crate_name: &str,
        cargo_pkg_version: &str,
    ) -> Result<Observability, ObservabilityError> {
        let endpoint = config
            .otel_exporter_otlp_endpoint
            .as_deref()
            .filter(|e| !e.is_empty());

        let (tracer_provider, meter_provider) = match endpoint {
            Some(endpoint) => {
                global::set_text_map_propagator(TraceContextPropagator::new());
                let resource = Self::get_resource(cargo_crate_name, cargo_pkg_version);
                (
                    Some(Self::init_tracer_provider(resource.clone(), endpoint)?),
                    Some(Self::init_meter_provider(resource, endpoint)?),
                )
            }
            None => (None, None),
        };

        let open_telemetry_layer = tracer_provider
            .as_ref()
            .map(|provider| OpenTelemetryLayer::new(provider.tracer("buildtask")));
        let metrics_layer = meter_provider
            .as_ref()
            .map(|provider| MetricsLayer::new(provider.clone()));

        let env_filter = Self::env_filter(config.rust_log.as_deref(), config.tracing_level.as_deref());

        // Stdout carries command output, so logs go to stderr
        let timer = LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ));
        let with_file = config.with_file.unwrap_or(false);
        let with_line_number = config.with_line_number.unwrap_or(false);

        let fmt_layer = if config.log_format.as_deref() == Some("pretty") {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_timer(timer)
                .with_target(false)
                .with_file(with_file)
                .with_line_number(with_line_number)
                .compact()
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer)
                .with_target(false)
                .with_file(with_file)
                .with_line_number(with_line_number)
                .json()
                .flatten_event(true)
                .with_span_list(false)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(metrics_layer)
            .with(open_telemetry_layer)
            .try_init()?;

        Ok(Observability {
            tracer_provider,
            meter_provider,
        })
    }

    pub fn parse_level(tracing_level: Option<&str>) -> Level {
        match tracing_level.map(str::to_uppercase).as_deref() {
            Some("TRACE") => Level::TRACE,
            Some("DEBUG") => Level::DEBUG,
            Some("WARN") => Level::WARN,
            Some("ERROR") => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// `rust_log` wins, then `RUST_LOG`, then `tracing_level`.
    fn env_filter(rust_log: Option<&str>, tracing_level: Option<&str>) -> EnvFilter {
        match rust_log {
            Some(rust_log) => EnvFilter::new(rust_log),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(Self::parse_level(tracing_level).as_str().to_lowercase())
            }),
        }
    }

    fn get_resource(cargo_crate_name: &str, cargo_pkg_version: &str) -> Resource {
        Resource::builder()
            .with_service_name(cargo_crate_name.to_string())
            .with_schema_url(
                [KeyValue::new(SERVICE_VERSION, cargo_pkg_version.to_string())],
                SCHEMA_URL,
            )
            .build()
    }

    fn init_tracer_provider(
        resource: Resource,
        endpoint: &str,
    ) -> Result<SdkTracerProvider, ObservabilityError> {
        let mut exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_compression(opentelemetry_otlp::Compression::Gzip);

        if endpoint.starts_with("https://") {
            exporter = exporter.with_tls_config(ClientTlsConfig::new().with_native_roots());
        }

        let tracer_provider = SdkTracerProvider::builder()
            .with_id_generator(RandomIdGenerator::default())
            .with_batch_exporter(exporter.build()?)
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource)
            .build();

        global::set_tracer_provider(tracer_provider.clone());

        Ok(tracer_provider)
    }

    fn init_meter_provider(
        resource: Resource,
        endpoint: &str,
    ) -> Result<SdkMeterProvider, ObservabilityError> {
        let mut exporter = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_compression(opentelemetry_otlp::Compression::Gzip);

        if endpoint.starts_with("https://") {
            exporter = exporter.with_tls_config(ClientTlsConfig::new().with_native_roots());
        }

        let reader = PeriodicReader::builder(exporter.build()?)
            .with_interval(std::time::Duration::from_secs(30))
            .build();

        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource)
            .with_reader(reader)
            .build();

        global::set_meter_provider(meter_provider.clone());

        Ok(meter_provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(Observability::parse_level(None), Level::INFO);
        assert_eq!(Observability::parse_level(Some("debug")), Level::DEBUG);
        assert_eq!(Observability::parse_level(Some("ERROR")), Level::ERROR);
        assert_eq!(Observability::parse_level(Some("verbose")), Level::INFO);
    }

    #[test]
    fn test_config_defaults_to_stderr_only() {
        let config: ObservabilityConfig = serde_json::from_str(r#"{"log_format":"pretty"}"#).unwrap();

        assert_eq!(config.otel_exporter_otlp_endpoint, None);
        assert_eq!(config.log_format.as_deref(), Some("pretty"));
    }
}
