use anyhow::Context;
use axum::http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS};
use axum::http::Method;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

const WILDCARD: &str = "*";

/// Cross-origin policy applied to every response, preflights included.
///
/// A list containing `*` means "all". The default allows every origin,
/// method and header, with credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec![WILDCARD.to_owned()],
            allow_credentials: true,
            allow_methods: vec![WILDCARD.to_owned()],
            allow_headers: vec![WILDCARD.to_owned()],
        }
    }
}

impl CorsPolicy {
    /// Wrap `router` with this policy.
    ///
    /// `CorsLayer` refuses to pair credentials with a wildcard origin, so in
    /// that case the origin stays `*`, methods and headers are mirrored from
    /// the preflight, and the credentials header is set by a separate layer.
    ///
    /// # Errors
    ///
    /// Returns an error if an origin, method or header name is not valid HTTP.
    pub(crate) fn apply(&self, router: Router) -> anyhow::Result<Router> {
        let any_origin = is_wildcard(&self.allow_origins);
        let layer_credentials = self.allow_credentials && !any_origin;

        let origin = if any_origin {
            AllowOrigin::from(Any)
        } else {
            let origins = self
                .allow_origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin `{o}`"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        };

        // Browsers read `*` literally on credentialed requests, so mirror instead.
        let methods = match (is_wildcard(&self.allow_methods), self.allow_credentials) {
            (true, false) => AllowMethods::from(Any),
            (true, true) => AllowMethods::mirror_request(),
            (false, _) => {
                let methods = self
                    .allow_methods
                    .iter()
                    .map(|m| {
                        Method::from_bytes(m.as_bytes())
                            .with_context(|| format!("invalid CORS method `{m}`"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                AllowMethods::list(methods)
            }
        };

        let headers = match (is_wildcard(&self.allow_headers), self.allow_credentials) {
            (true, false) => AllowHeaders::from(Any),
            (true, true) => AllowHeaders::mirror_request(),
            (false, _) => {
                let headers = self
                    .allow_headers
                    .iter()
                    .map(|h| {
                        HeaderName::from_bytes(h.as_bytes())
                            .with_context(|| format!("invalid CORS header `{h}`"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                AllowHeaders::list(headers)
            }
        };

        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(layer_credentials);
        let router = router.layer(cors);

        if self.allow_credentials && any_origin {
            Ok(router.layer(SetResponseHeaderLayer::if_not_present(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            )))
        } else {
            Ok(router)
        }
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == WILDCARD)
}
