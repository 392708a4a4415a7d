use otel_backend::TracedClient;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_owned());

    let _guard = otel_backend::init_telemetry("backend-probe", None)?;

    tracing::info!(%base_url, "Probe started");

    let message = fetch_message(&TracedClient::new(), &base_url).await?;
    tracing::info!(%message, "Backend says");

    Ok(())
}

#[tracing::instrument(skip(client))]
async fn fetch_message(client: &TracedClient, base_url: &str) -> anyhow::Result<String> {
    let response = client
        .get(&format!("{base_url}/api/message"))
        .await?
        .error_for_status()?;
    let body: MessageBody = response.json().await?;
    Ok(body.message)
}
