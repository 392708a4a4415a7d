//! Outbound HTTP with client spans.
//!
//! Instrumentation is attached to this client explicitly; plain
//! `reqwest::Client` values elsewhere in a process stay untraced.

use anyhow::Context;
use reqwest::header::HeaderMap;
use tracing::field::Empty;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::propagation::inject_context;

/// A [`reqwest::Client`] that opens a client span per request and forwards the
/// trace context downstream in a `traceparent` header.
///
/// The span nests under whatever span is current when the request is made,
/// or starts a new trace when there is none.
#[derive(Debug, Clone, Default)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already configured client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Send `GET url`.
    ///
    /// The span is marked as an error on transport failure or a 5xx status;
    /// the status itself is returned to the caller untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or no response arrived.
    pub async fn get(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let span = tracing::info_span!(
            "HTTP client request",
            otel.name = "GET",
            otel.kind = "client",
            http.request.method = "GET",
            url.full = %url,
            http.response.status_code = Empty,
            otel.status_code = Empty,
        );

        let mut headers = HeaderMap::new();
        inject_context(&span.context(), &mut headers);

        let request = self.inner.get(url).headers(headers);
        let recorder = span.clone();
        async move {
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    recorder.record("http.response.status_code", status.as_u16());
                    if status.is_server_error() {
                        recorder.record("otel.status_code", "ERROR");
                    }
                    Ok(response)
                }
                Err(e) => {
                    recorder.record("otel.status_code", "ERROR");
                    tracing::warn!(error = %e, "outbound request failed");
                    Err(e).with_context(|| format!("GET {url} failed"))
                }
            }
        }
        .instrument(span)
        .await
    }
}
