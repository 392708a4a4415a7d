use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Lifecycle guard for the telemetry pipeline.
///
/// Holds the OTel providers and the Prometheus scrape handle. **Must be held
/// for the duration of the application.**
///
/// Dropping the guard:
/// 1. Flushes all pending spans and log records
/// 2. Shuts down all providers gracefully
///
/// Shutdown blocks the calling thread while batches drain; from async code
/// call [`TelemetryGuard::shutdown`] on a blocking thread.
///
/// # Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let guard = otel_backend::init_telemetry(otel_backend::SERVICE_NAME, None)?;
/// let app = otel_backend::server::build_router(guard.metrics_handle(), &Default::default())?;
/// // ... serve `app` ...
/// # drop(app);
/// # Ok(())
/// # }
/// ```
#[must_use = "dropping the TelemetryGuard immediately shuts down the telemetry pipeline — \
              hold it for the lifetime of your application (e.g. `let _guard = ...;`)"]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
    metrics: PrometheusHandle,
    shutdown_called: bool,
}

impl TelemetryGuard {
    pub(crate) fn new(
        tracer_provider: Option<SdkTracerProvider>,
        logger_provider: Option<SdkLoggerProvider>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            tracer_provider,
            logger_provider,
            metrics,
            shutdown_called: false,
        }
    }

    /// Handle used by the `/metrics` route to render the current snapshot.
    pub fn metrics_handle(&self) -> PrometheusHandle {
        self.metrics.clone()
    }

    /// Explicitly flush and shut down all providers.
    ///
    /// Safe to call multiple times; subsequent calls are no-ops.
    /// This is also called automatically when the guard is dropped.
    pub fn shutdown(&mut self) {
        if self.shutdown_called {
            return;
        }
        self.shutdown_called = true;
        self.do_shutdown();
    }

    fn do_shutdown(&self) {
        if let Some(ref tp) = self.tracer_provider {
            if let Err(e) = tp.force_flush() {
                eprintln!("otel-backend: error flushing tracer provider: {e}");
            }
            if let Err(e) = tp.shutdown() {
                eprintln!("otel-backend: error shutting down tracer provider: {e}");
            }
        }

        if let Some(ref lp) = self.logger_provider {
            if let Err(e) = lp.force_flush() {
                eprintln!("otel-backend: error flushing logger provider: {e}");
            }
            if let Err(e) = lp.shutdown() {
                eprintln!("otel-backend: error shutting down logger provider: {e}");
            }
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if !self.shutdown_called {
            self.shutdown_called = true;
            self.do_shutdown();
        }
    }
}
