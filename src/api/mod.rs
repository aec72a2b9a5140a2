//! API layer
//!
//! HTTP handlers for:
//! - Status reblogs
//! - Announcements (viewers and admins)
//! - Metrics (Prometheus)

mod admin;
mod announcements;
mod dto;
pub mod metrics;
mod statuses;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::AppState;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;

/// Create the `/api` router
///
/// Routes:
/// - POST /v1/statuses/:id/reblog
/// - POST /v1/statuses/:id/unreblog
/// - GET /v1/announcements
/// - POST /v1/announcements/:id/dismiss
/// - PUT|DELETE /v1/announcements/:id/reactions/:name
/// - GET|POST /v1/admin/announcements
/// - PUT|DELETE /v1/admin/announcements/:id
/// - POST /v1/admin/announcements/:id/publish
/// - POST /v1/admin/announcements/:id/unpublish
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Statuses
        .route("/v1/statuses/:id/reblog", post(statuses::reblog_status))
        .route("/v1/statuses/:id/unreblog", post(statuses::unreblog_status))
        // Announcements
        .route(
            "/v1/announcements",
            get(announcements::list_announcements),
        )
        .route(
            "/v1/announcements/:id/dismiss",
            post(announcements::dismiss_announcement),
        )
        .route(
            "/v1/announcements/:id/reactions/:name",
            put(announcements::add_reaction).delete(announcements::remove_reaction),
        )
        // Admin
        .route(
            "/v1/admin/announcements",
            get(admin::list_announcements).post(admin::create_announcement),
        )
        .route(
            "/v1/admin/announcements/:id",
            put(admin::update_announcement).delete(admin::delete_announcement),
        )
        .route(
            "/v1/admin/announcements/:id/publish",
            post(admin::publish_announcement),
        )
        .route(
            "/v1/admin/announcements/:id/unpublish",
            post(admin::unpublish_announcement),
        )
}

/// Count a handled request by outcome
fn record_request<T>(method: &str, endpoint: &str, result: &Result<T, AppError>) {
    let status = match result {
        Ok(_) => "200".to_string(),
        Err(error) => error.status_code().as_u16().to_string(),
    };
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status])
        .inc();
}
