//! OTLP providers, one per exported signal.

pub(crate) mod logger;
pub(crate) mod tracer;

use crate::env::ResolvedConfig;

/// Telemetry signal shipped to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Traces,
    Logs,
}

impl Signal {
    fn http_path(self) -> &'static str {
        match self {
            Self::Traces => "/v1/traces",
            Self::Logs => "/v1/logs",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Traces => "span",
            Self::Logs => "log",
        }
    }
}

/// OTLP/HTTP exporters post each signal to its own path under the collector base URL.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn http_endpoint(config: &ResolvedConfig, signal: Signal) -> String {
    format!("{}{}", config.endpoint, signal.http_path())
}

#[cfg_attr(all(feature = "grpc", feature = "http"), allow(dead_code))]
pub(crate) fn missing_transport(signal: Signal, feature: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "{} export needs the `{feature}` feature. Rebuild with `--features {feature}` \
         or pick the other OTEL_EXPORTER_OTLP_PROTOCOL",
        signal.name()
    )
}
