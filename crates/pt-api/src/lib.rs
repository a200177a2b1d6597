//! # pt-api
//!
//! Read-only JSON adapter handing page contexts and the feed to the rendering layer.

pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the routes for the page tree.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // Per-type rendering context (tags, tops, feed)
            .route("/pages/{page_id}/context", web::get().to(handlers::page_context))
            // Direct children of a page
            .route("/pages/{page_id}/children", web::get().to(handlers::page_children))
            // The recent-articles feed
            .route("/feed", web::get().to(handlers::feed))
            // Image metadata with resolved URLs
            .route("/images/{image_id}", web::get().to(handlers::image_detail)),
    );
}
