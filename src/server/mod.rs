//! HTTP surface: routes plus the cross-cutting layers wrapped around them.
//!
//! Layer order, outermost first:
//! ```text
//! request span ─▶ request metrics ─▶ CORS ─▶ panic → 500 ─▶ handler
//! ```
//! The span and the metric therefore see every outcome, preflights and
//! panics included.

pub mod cors;
pub mod request_metrics;
pub mod routes;
mod trace;

use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;

pub use cors::CorsPolicy;
pub use request_metrics::{
    install_recorder, spawn_upkeep, METRICS_PATH, UPKEEP_INTERVAL,
};

/// Build the application router: data routes, the scrape route, and all layers.
///
/// # Errors
///
/// Returns an error if the CORS policy contains invalid values.
pub fn build_router(metrics: PrometheusHandle, cors: &CorsPolicy) -> anyhow::Result<Router> {
    instrument(
        routes::router().merge(request_metrics::router(metrics)),
        cors,
    )
}

/// Wrap any router in the tracing, metrics, CORS and panic layers.
///
/// Applied once, to the shared router, before the server starts accepting connections.
///
/// # Errors
///
/// Returns an error if the CORS policy contains invalid values.
pub fn instrument(router: Router, cors: &CorsPolicy) -> anyhow::Result<Router> {
    let router = cors.apply(router.layer(CatchPanicLayer::new()))?;
    Ok(router
        .layer(middleware::from_fn(request_metrics::track))
        .layer(trace::layer()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN};
    use axum::http::{Method, Request, StatusCode};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use opentelemetry::trace::Status;
    use tower::ServiceExt;

    use super::routes::CUSTOM_SPAN_NAME;
    use super::*;
    use crate::test_support::CapturedSpans;

    const DATA_ROUTES: [(&str, &str); 4] = [
        ("/", r#"{"message":"Hello from FastAPI backend!"}"#),
        ("/api/health", r#"{"status":"ok"}"#),
        ("/api/message", r#"{"message":"Hello from FastAPI API"}"#),
        ("/trace", r#"{"message":"This route creates a custom trace span!"}"#),
    ];

    async fn explode() -> &'static str {
        panic!("handler failure")
    }

    fn app() -> Router {
        build_router(install_recorder().unwrap(), &CorsPolicy::default()).unwrap()
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn data_routes_return_fixed_json() {
        for (uri, expected) in DATA_ROUTES {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(response.headers()[CONTENT_TYPE], "application/json", "{uri}");
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(bytes, expected.as_bytes(), "{uri}");
        }
    }

    #[tokio::test]
    async fn root_body_never_varies() {
        let (_, first) = get_body(app(), "/").await;
        for _ in 0..5 {
            let (_, again) = get_body(app(), "/").await;
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = get_body(app(), "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scrape_reports_health_route_counter() {
        let app = app();
        let (status, _) = get_body(app.clone(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        let sample = body
            .lines()
            .find(|line| {
                line.starts_with("http_requests_total{")
                    && line.contains(r#"handler="/api/health""#)
            })
            .unwrap_or_else(|| panic!("no counter sample for /api/health in:\n{body}"));
        assert!(sample.contains(r#"status="2xx""#));
        assert!(body.contains("http_request_duration_seconds_bucket"));
    }

    #[tokio::test]
    async fn scrapes_are_not_counted() {
        let app = app();
        get_body(app.clone(), METRICS_PATH).await;
        let (_, body) = get_body(app, METRICS_PATH).await;

        assert!(!body.contains(r#"handler="/metrics""#));
    }

    #[tokio::test]
    async fn preflight_on_every_route_allows_any_origin() {
        for uri in ["/", "/api/health", "/api/message", "/trace", METRICS_PATH] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .header(ORIGIN, "http://frontend.local")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap();

            let response = app().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*", "{uri}");
        }
    }

    #[tokio::test]
    async fn trace_route_emits_one_closed_child_span() {
        let spans = CapturedSpans::install();

        let (status, _) = get_body(app(), "/trace").await;
        assert_eq!(status, StatusCode::OK);

        let custom = spans.named(CUSTOM_SPAN_NAME);
        assert_eq!(custom.len(), 1);
        let custom = &custom[0];
        assert!(custom.end_time >= custom.start_time);

        let request = spans.named("GET /trace");
        assert_eq!(request.len(), 1);
        assert_eq!(custom.parent_span_id, request[0].span_context.span_id());
        assert_eq!(
            custom.span_context.trace_id(),
            request[0].span_context.trace_id()
        );
    }

    #[tokio::test]
    async fn request_span_carries_route_and_status() {
        let spans = CapturedSpans::install();

        get_body(app(), "/api/health").await;

        let request = spans.named("GET /api/health");
        assert_eq!(request.len(), 1);
        let attribute = |key: &str| {
            request[0]
                .attributes
                .iter()
                .find(|kv| kv.key.as_str() == key)
                .map(|kv| kv.value.to_string())
        };
        assert_eq!(attribute("http.route").as_deref(), Some("/api/health"));
        assert_eq!(attribute("http.response.status_code").as_deref(), Some("200"));
    }

    #[tokio::test]
    async fn request_span_joins_incoming_trace() {
        let spans = CapturedSpans::install();
        opentelemetry::global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );

        let request = Request::builder()
            .uri("/api/message")
            .header(
                "traceparent",
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            )
            .body(Body::empty())
            .unwrap();
        app().oneshot(request).await.unwrap();

        let request = spans.named("GET /api/message");
        assert_eq!(request.len(), 1);
        assert_eq!(
            request[0].span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(request[0].parent_span_id.to_string(), "00f067aa0ba902b7");
    }

    #[tokio::test]
    async fn handler_panic_becomes_500_and_error_span() {
        let spans = CapturedSpans::install();
        let app = instrument(
            Router::new().route("/boom", get(explode)),
            &CorsPolicy::default(),
        )
        .unwrap();

        let (status, _) = get_body(app, "/boom").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let request = spans.named("GET /boom");
        assert_eq!(request.len(), 1);
        assert!(matches!(request[0].status, Status::Error { .. }));
    }

    #[cfg(feature = "grpc")]
    fn grpc_provider(endpoint: &str) -> opentelemetry_sdk::trace::SdkTracerProvider {
        use std::collections::HashMap;
        use std::time::Duration;

        use crate::env::ResolvedConfig;
        use crate::options::Protocol;

        let config = ResolvedConfig {
            service_name: "export-test".to_owned(),
            endpoint: endpoint.to_owned(),
            protocol: Protocol::Grpc,
            resource_attributes: HashMap::new(),
            export_timeout: Duration::from_millis(200),
        };
        let resource = crate::resource::build_resource(&config.service_name, &HashMap::new());
        crate::providers::tracer::build_tracer_provider(resource, &config).unwrap()
    }

    #[cfg(feature = "grpc")]
    fn export_to(
        provider: &opentelemetry_sdk::trace::SdkTracerProvider,
    ) -> tracing::subscriber::DefaultGuard {
        use opentelemetry::trace::TracerProvider as _;
        use tracing_subscriber::prelude::*;

        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("export-test")));
        tracing::subscriber::set_default(subscriber)
    }

    #[cfg(feature = "grpc")]
    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_collector_never_affects_responses() {
        let provider = grpc_provider("http://127.0.0.1:1");
        let _default = export_to(&provider);

        for (uri, expected) in DATA_ROUTES {
            let (status, body) = get_body(app(), uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, expected, "{uri}");
        }

        // Export fails against the dead endpoint; only the flush reports it.
        let flush = provider.clone();
        tokio::task::spawn_blocking(move || flush.force_flush())
            .await
            .unwrap()
            .ok();
        tokio::task::spawn_blocking(move || provider.shutdown())
            .await
            .unwrap()
            .ok();
    }

    #[cfg(feature = "grpc")]
    #[tokio::test(flavor = "multi_thread")]
    async fn trace_route_export_dials_configured_collector() {
        use std::time::Duration;

        let collector = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", collector.local_addr().unwrap());
        let accepted = tokio::spawn(async move {
            tokio::time::timeout(Duration::from_secs(5), collector.accept())
                .await
                .is_ok_and(|conn| conn.is_ok())
        });

        let provider = grpc_provider(&endpoint);
        {
            let _default = export_to(&provider);
            let (status, _) = get_body(app(), "/trace").await;
            assert_eq!(status, StatusCode::OK);
        }

        // Nothing answers gRPC here, so the flush itself times out.
        let flush = provider.clone();
        tokio::task::spawn_blocking(move || flush.force_flush())
            .await
            .unwrap()
            .ok();

        assert!(accepted.await.unwrap(), "no export reached {endpoint}");

        tokio::task::spawn_blocking(move || provider.shutdown())
            .await
            .unwrap()
            .ok();
    }
}
