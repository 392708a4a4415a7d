use std::net::SocketAddr;

use crate::env::env_var_non_empty;
use crate::error::SetupError;
use crate::server::CorsPolicy;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Listener and CORS settings for the binary.
///
/// - `BIND_ADDRESS` — socket to listen on (default `0.0.0.0:8000`)
/// - `CORS_ALLOW_ORIGINS` — comma-separated origins, `*` for all (default `*`)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub cors: CorsPolicy,
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidBindAddress`] if `BIND_ADDRESS` is not a socket address.
    pub fn from_env() -> Result<Self, SetupError> {
        let raw =
            env_var_non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let bind_address = raw
            .parse::<SocketAddr>()
            .map_err(|source| SetupError::InvalidBindAddress {
                address: raw.clone(),
                source,
            })?;

        let mut cors = CorsPolicy::default();
        if let Some(origins) = env_var_non_empty("CORS_ALLOW_ORIGINS") {
            cors.allow_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_owned)
                .collect();
        }

        Ok(Self { bind_address, cors })
    }
}
