use anyhow::Context;
use opentelemetry_otlp::{ExporterBuildError, LogExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::Resource;

use super::Signal;
use crate::env::ResolvedConfig;
use crate::options::Protocol;

/// Log records from `tracing` events, batched to the collector next to the spans.
///
/// Only built with the `logs` feature. Stdout logging never depends on it, and
/// events from the exporter's own transport crates are filtered out before they
/// reach this provider (see `subscriber.rs`).
///
/// # Errors
///
/// Returns an error if the transport for the configured protocol is not compiled in.
pub(crate) fn build_logger_provider(
    resource: Resource,
    config: &ResolvedConfig,
) -> anyhow::Result<SdkLoggerProvider> {
    let exporter = log_exporter(config).context("Failed to build OTLP log exporter")?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

fn log_exporter(config: &ResolvedConfig) -> anyhow::Result<LogExporter> {
    let exporter: Result<LogExporter, ExporterBuildError> = match config.protocol {
        #[cfg(feature = "grpc")]
        Protocol::Grpc => LogExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.export_timeout)
            .build(),
        #[cfg(not(feature = "grpc"))]
        Protocol::Grpc => return Err(super::missing_transport(Signal::Logs, "grpc")),
        #[cfg(feature = "http")]
        Protocol::HttpProtobuf | Protocol::HttpJson => LogExporter::builder()
            .with_http()
            .with_endpoint(super::http_endpoint(config, Signal::Logs))
            .with_timeout(config.export_timeout)
            .build(),
        #[cfg(not(feature = "http"))]
        Protocol::HttpProtobuf | Protocol::HttpJson => {
            return Err(super::missing_transport(Signal::Logs, "http"))
        }
    };
    exporter.with_context(|| format!("OTLP {:?} log exporter", config.protocol))
}
