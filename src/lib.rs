//! # otel-backend
//!
//! A small demonstration HTTP backend wired to three cross-cutting concerns:
//! OTLP trace export, a Prometheus scrape endpoint, and leveled request logging.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | `{"message":"Hello from FastAPI backend!"}` |
//! | `GET /api/health` | `{"status":"ok"}` |
//! | `GET /api/message` | `{"message":"Hello from FastAPI API"}` |
//! | `GET /trace` | `{"message":"This route creates a custom trace span!"}` plus a `custom-span-trace` span |
//! | `GET /metrics` | Prometheus text exposition |
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! use otel_backend::{config::ServerConfig, server};
//!
//! let _guard = otel_backend::init_telemetry(otel_backend::SERVICE_NAME, None)?;
//! let config = ServerConfig::from_env()?;
//! let app = server::build_router(_guard.metrics_handle(), &config.cors)?;
//! let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod env;
mod guard;
mod options;
mod propagation;
mod providers;
mod resource;
mod subscriber;

pub mod client;
pub mod config;
pub mod error;
pub mod server;

#[cfg(test)]
mod test_support;

pub use client::TracedClient;
pub use error::SetupError;
pub use guard::TelemetryGuard;
pub use options::{Protocol, TelemetryOptions, TelemetryOptionsBuilder};

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;

/// `service.name` reported by the backend binary.
pub const SERVICE_NAME: &str = "fastapi-backend";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide telemetry pipeline.
///
/// In order: W3C trace-context propagator, tracer provider (OTLP exporter
/// behind a batch processor) registered as the global provider, optional OTLP
/// log provider, Prometheus recorder, and the global `tracing` subscriber.
/// This is the only place in the crate that writes process-wide telemetry state.
///
/// The exporter dials the collector lazily, so an unreachable collector never
/// fails startup; failed batch exports are logged and dropped.
///
/// Must be called from within a Tokio runtime when the `grpc` transport is used.
///
/// # Configuration Priority
///
/// 1. **Programmatic** — values set in [`TelemetryOptions`]
/// 2. **Environment variables** — `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`, etc.
/// 3. **Defaults** — `collector:4317` over gRPC, 10s export timeout, `info` log level
///
/// # Errors
///
/// Returns an error if:
/// - The endpoint is malformed ([`SetupError::InvalidEndpoint`])
/// - Telemetry was already initialized in this process ([`SetupError::AlreadyInitialized`])
/// - A required transport feature is not enabled, or an exporter fails to build
/// - A global subscriber or metrics recorder was installed by someone else
///
/// A failure after the once-guard has been taken leaves the process
/// uninitializable; treat any error here as fatal.
pub fn init_telemetry(
    service_name: &str,
    options: Option<TelemetryOptions>,
) -> anyhow::Result<TelemetryGuard> {
    let opts = options.unwrap_or_default();
    let resolved = env::resolve_config(service_name, &opts)?;

    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(SetupError::AlreadyInitialized.into());
    }

    opentelemetry::global::set_text_map_propagator(
        opentelemetry_sdk::propagation::TraceContextPropagator::new(),
    );

    let resource = resource::build_resource(&resolved.service_name, &resolved.resource_attributes);

    let tracer_provider = if cfg!(feature = "traces") {
        let provider = providers::tracer::build_tracer_provider(resource.clone(), &resolved)
            .context("Failed to initialize tracer provider")?;
        opentelemetry::global::set_tracer_provider(provider.clone());
        Some(provider)
    } else {
        None
    };

    let logger_provider = if cfg!(feature = "logs") {
        Some(
            providers::logger::build_logger_provider(resource, &resolved)
                .context("Failed to initialize logger provider")?,
        )
    } else {
        None
    };

    let metrics = server::install_recorder().context("Failed to initialize metrics")?;

    subscriber::compose_subscriber(tracer_provider.as_ref(), logger_provider.as_ref())
        .context("Failed to compose and set global subscriber")?;

    tracing::info!(
        service.name = %resolved.service_name,
        endpoint = %resolved.endpoint,
        protocol = ?resolved.protocol,
        "telemetry initialized"
    );

    Ok(TelemetryGuard::new(tracer_provider, logger_provider, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "grpc")]
    #[tokio::test(flavor = "multi_thread")]
    async fn second_initialization_is_rejected() {
        let options = || {
            TelemetryOptions::builder()
                .endpoint("127.0.0.1:1")
                .protocol(Protocol::Grpc)
                .export_timeout(std::time::Duration::from_millis(200))
                .build()
        };

        let tls = TelemetryOptions::builder().endpoint("https://x").build();
        let err = init_telemetry("bad", Some(tls)).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::InvalidEndpoint { .. })
        ));

        let guard = init_telemetry("once-test", Some(options())).unwrap();

        let err = init_telemetry("once-test", Some(options())).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::AlreadyInitialized)
        ));

        tokio::task::spawn_blocking(move || drop(guard)).await.unwrap();
    }
}
