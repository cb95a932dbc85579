/// Status API.
///
/// Read-only queries over the store plus the check-now trigger. Handlers get
/// everything they need from an explicit `ApiContext`; no probing happens
/// here.
pub mod error;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use actix_web::web;

use crate::database::Store;
use crate::monitoring::Monitor;

pub use error::ApiError;

/// Immutable context injected into every request handler.
pub struct ApiContext {
    pub store: Arc<dyn Store>,
    pub monitor: Arc<Monitor>,
}

/// Register the API surface on an actix application.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health_route)
        .service(routes::status_route)
        .service(routes::history_route)
        .service(routes::check_now_route);
}
