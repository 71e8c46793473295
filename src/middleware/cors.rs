//! CORS policy for browser clients (the casting agency front end).
//!
//! Policy:
//! - Development: Allow-Origin: *, without credentials.
//! - Production: exact-match allowlist from `CORS_ALLOWED_ORIGINS`. An empty list allows none.
//! - Methods: GET, PATCH, POST, DELETE, OPTIONS. Headers: Content-Type, Authorization.

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

pub fn layer(config: &Config) -> CorsLayer {
    let cors = if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        CorsLayer::new().allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _req| allowed.iter().any(|v| v == origin),
        ))
    } else {
        CorsLayer::new().allow_origin(Any)
    };

    cors.allow_methods([
        Method::GET,
        Method::PATCH,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Do not combine `Any` with `allow_credentials(true)`.
pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(config))
}
