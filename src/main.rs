use anyhow::Context;
use otel_backend::config::ServerConfig;
use otel_backend::server;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut guard = otel_backend::init_telemetry(otel_backend::SERVICE_NAME, None)?;
    let config = ServerConfig::from_env()?;

    let app = server::build_router(guard.metrics_handle(), &config.cors)?;
    let upkeep = server::spawn_upkeep(guard.metrics_handle(), server::UPKEEP_INTERVAL);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    upkeep.abort();
    tracing::info!("server stopped, flushing telemetry");
    // Flushing blocks until pending batches are exported or time out.
    tokio::task::spawn_blocking(move || guard.shutdown())
        .await
        .context("telemetry shutdown task panicked")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
