use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Crates the OTLP exporters use to ship telemetry.
const TRANSPORT_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "tonic", "tower", "reqwest"];

/// Compose and globally register the process subscriber.
///
/// Layers added:
/// - [`EnvFilter`] — respects `RUST_LOG` (defaults to `info`)
/// - `fmt` — leveled text lines on stdout
/// - `OpenTelemetryLayer` — turns `tracing` spans into OTel spans (if tracer provider given)
/// - `OpenTelemetryTracingBridge` — exports events as OTel log records (if logger
///   provider given), minus events from the exporter's own transport crates
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub(crate) fn compose_subscriber(
    tracer_provider: Option<&SdkTracerProvider>,
    logger_provider: Option<&SdkLoggerProvider>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    let otel_trace_layer = tracer_provider.map(|tp| {
        use opentelemetry::trace::TracerProvider as _;
        tracing_opentelemetry::layer().with_tracer(tp.tracer(env!("CARGO_PKG_NAME")))
    });

    let otel_log_layer = logger_provider.map(|lp| {
        OpenTelemetryTracingBridge::new(lp)
            .with_filter(filter_fn(|meta| !is_transport_target(meta.target())))
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_trace_layer)
        .with(otel_log_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {e}"))?;

    Ok(())
}

/// Exporting these crates' events would generate more export traffic per export.
fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS.iter().any(|krate| {
        target == *krate
            || target
                .strip_prefix(krate)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_crates_are_kept_out_of_log_export() {
        assert!(is_transport_target("tonic"));
        assert!(is_transport_target("h2::codec"));
        assert!(is_transport_target("hyper_util::client::legacy"));
        assert!(!is_transport_target("otel_backend::server::routes"));
        assert!(!is_transport_target("towering"));
    }
}
