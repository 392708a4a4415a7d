use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::error::SetupError;
use crate::options::{Protocol, TelemetryOptions};

const DEFAULT_GRPC_ENDPOINT: &str = "collector:4317";
const DEFAULT_HTTP_ENDPOINT: &str = "collector:4318";
const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fully resolved configuration after merging programmatic options, env vars, and defaults.
///
/// Priority (highest to lowest):
/// 1. Programmatic — values set in [`TelemetryOptions`]
/// 2. Environment variables — `OTEL_SERVICE_NAME`, `OTEL_EXPORTER_OTLP_*`
/// 3. Defaults — `collector:4317` over gRPC, 10s timeout
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub service_name: String,
    /// Always carries an `http://` scheme and no trailing slash.
    pub endpoint: String,
    pub protocol: Protocol,
    pub resource_attributes: HashMap<String, String>,
    pub export_timeout: Duration,
}

/// Resolve configuration by merging programmatic options, env vars, and defaults.
///
/// Fails only on an endpoint that cannot be dialed in plaintext; reachability
/// is never checked here.
pub(crate) fn resolve_config(
    service_name: &str,
    opts: &TelemetryOptions,
) -> Result<ResolvedConfig, SetupError> {
    let service_name =
        env_var_non_empty("OTEL_SERVICE_NAME").unwrap_or_else(|| service_name.to_owned());

    let protocol = opts
        .protocol
        .or_else(parse_protocol_env)
        .unwrap_or(Protocol::Grpc);

    let default_endpoint = match protocol {
        Protocol::Grpc => DEFAULT_GRPC_ENDPOINT,
        Protocol::HttpProtobuf | Protocol::HttpJson => DEFAULT_HTTP_ENDPOINT,
    };

    let raw_endpoint = opts
        .endpoint
        .clone()
        .or_else(|| env_var_non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"))
        .unwrap_or_else(|| default_endpoint.to_owned());
    let endpoint = normalize_endpoint(&raw_endpoint)?;

    let export_timeout = opts
        .export_timeout
        .or_else(parse_timeout_env)
        .unwrap_or(DEFAULT_EXPORT_TIMEOUT);

    Ok(ResolvedConfig {
        service_name,
        endpoint,
        protocol,
        resource_attributes: opts.resource_attributes.clone(),
        export_timeout,
    })
}

pub(crate) fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_protocol_env() -> Option<Protocol> {
    env_var_non_empty("OTEL_EXPORTER_OTLP_PROTOCOL").and_then(|v| match v.as_str() {
        "grpc" => Some(Protocol::Grpc),
        "http/protobuf" => Some(Protocol::HttpProtobuf),
        "http/json" => Some(Protocol::HttpJson),
        _ => None,
    })
}

fn parse_timeout_env() -> Option<Duration> {
    env_var_non_empty("OTEL_EXPORTER_OTLP_TIMEOUT")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Turn `host:port` or `http://host:port` into a plaintext collector URL.
fn normalize_endpoint(raw: &str) -> Result<String, SetupError> {
    let invalid = |reason: String| SetupError::InvalidEndpoint {
        endpoint: raw.to_owned(),
        reason,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("endpoint is empty".to_owned()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!(
            "scheme `{}` is not supported, the exporter dials without TLS",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_owned()));
    }

    Ok(candidate.trim_end_matches('/').to_owned())
}
