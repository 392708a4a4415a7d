use std::net::AddrParseError;

use thiserror::Error;

/// Setup failures callers may want to tell apart.
///
/// These travel inside the [`anyhow::Error`] returned by the setup functions;
/// recover them with [`anyhow::Error::downcast_ref`].
#[derive(Debug, Error)]
pub enum SetupError {
    /// The collector endpoint is not a plaintext `host:port` or `http://` URL.
    #[error("invalid OTLP endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The listen address is not a socket address.
    #[error("invalid bind address `{address}`: {source}")]
    InvalidBindAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    /// [`crate::init_telemetry`] was called a second time in this process.
    #[error("telemetry is already initialized; re-initialization is unsupported")]
    AlreadyInitialized,
}
