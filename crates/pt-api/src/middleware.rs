//! pagetree/crates/pt-api/src/middleware.rs Middleware
//!
//! Custom middleware for logging and cross-origin access.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Returns a standard request logger for the page tree API.
pub fn standard_middleware() -> Logger {
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

/// Configures CORS (Cross-Origin Resource Sharing).
/// The API is read only, so any origin may GET.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET"])
        .max_age(3600)
}
