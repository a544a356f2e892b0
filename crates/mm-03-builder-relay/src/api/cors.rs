//! CORS from the relay's origin list.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// `"*"` anywhere in `origins` allows every origin; otherwise only the
/// parseable entries are allowed.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(origins)
}
