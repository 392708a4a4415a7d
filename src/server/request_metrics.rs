//! Per-route request metrics and the Prometheus scrape route.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by `method`, `handler`, `status` class
//! - `http_request_duration_seconds` (histogram): latency by `method`, `handler`
//!
//! `handler` is the matched route template, or `none` when nothing matched.
//! Scrapes of [`METRICS_PATH`] are not recorded.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;

pub const METRICS_PATH: &str = "/metrics";

const REQUESTS_TOTAL: &str = "http_requests_total";
const REQUEST_DURATION: &str = "http_request_duration_seconds";
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// How often histogram samples are folded into their buckets between scrapes.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

static RECORDER: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Install the process-wide Prometheus recorder, or return the one already installed.
///
/// # Errors
///
/// Returns an error if another `metrics` recorder was installed outside this function.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let mut slot = RECORDER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_owned()), LATENCY_BUCKETS)
        .context("Failed to configure latency buckets")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    metrics::describe_counter!(
        REQUESTS_TOTAL,
        "Total number of requests by method, handler and status class."
    );
    metrics::describe_histogram!(
        REQUEST_DURATION,
        metrics::Unit::Seconds,
        "Request latency by method and handler."
    );

    *slot = Some(handle.clone());
    Ok(handle)
}

/// Periodically drain pending histogram samples so memory stays bounded
/// when nothing scrapes `/metrics`. Abort the returned task to stop it.
pub fn spawn_upkeep(handle: PrometheusHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
        }
    })
}

pub(crate) fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route(METRICS_PATH, get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], handle.render())
}

/// Middleware recording every request, whatever its outcome.
pub(crate) async fn track(request: Request, next: Next) -> Response {
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());
    if handler.as_deref() == Some(METRICS_PATH) {
        return next.run(request).await;
    }

    let handler = handler.unwrap_or_else(|| "none".to_owned());
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed().as_secs_f64();
    let status = status_class(response.status());

    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "handler" => handler.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION,
        "method" => method,
        "handler" => handler
    )
    .record(latency);

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
