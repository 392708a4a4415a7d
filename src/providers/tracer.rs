use anyhow::Context;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

use super::Signal;
use crate::env::ResolvedConfig;
use crate::options::Protocol;

/// Build a [`SdkTracerProvider`] that batches finished spans into an OTLP exporter.
///
/// The exporter connects lazily: an unreachable collector does not fail here,
/// it only fails individual batch exports, which the batch processor logs and drops.
/// Registering the provider globally is left to [`crate::init_telemetry`].
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be constructed from the configuration.
pub(crate) fn build_tracer_provider(
    resource: Resource,
    config: &ResolvedConfig,
) -> anyhow::Result<SdkTracerProvider> {
    let exporter = build_span_exporter(config).context("Failed to build OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    Ok(provider)
}

fn build_span_exporter(
    config: &ResolvedConfig,
) -> anyhow::Result<opentelemetry_otlp::SpanExporter> {
    match config.protocol {
        Protocol::Grpc => {
            #[cfg(feature = "grpc")]
            {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(&config.endpoint)
                    .with_timeout(config.export_timeout)
                    .build()
                    .context("Failed to build gRPC span exporter")?;
                Ok(exporter)
            }
            #[cfg(not(feature = "grpc"))]
            {
                Err(super::missing_transport(Signal::Traces, "grpc"))
            }
        }
        Protocol::HttpProtobuf | Protocol::HttpJson => {
            #[cfg(feature = "http")]
            {
                let endpoint = super::http_endpoint(config, Signal::Traces);
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .with_endpoint(endpoint)
                    .with_timeout(config.export_timeout)
                    .build()
                    .context("Failed to build HTTP span exporter")?;
                Ok(exporter)
            }
            #[cfg(not(feature = "http"))]
            {
                Err(super::missing_transport(Signal::Traces, "http"))
            }
        }
    }
}
