//! Admin API endpoints
//!
//! Announcement management. All routes require an administrator.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use super::announcements::build_announcement_service;
use super::{AdminAnnouncementResponse, record_request};
use crate::AppState;
use crate::auth::AdminAccount;
use crate::error::AppError;
use crate::service::AnnouncementParams;

/// GET /api/v1/admin/announcements
///
/// Every announcement, newest first.
pub async fn list_announcements(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
) -> Result<Json<Vec<AdminAnnouncementResponse>>, AppError> {
    let result = build_announcement_service(&state)
        .reverse_chronological()
        .await
        .map(|announcements| Json(announcements.into_iter().map(Into::into).collect()));

    record_request("GET", "/api/v1/admin/announcements", &result);
    result
}

/// POST /api/v1/admin/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    AdminAccount(admin): AdminAccount,
    Json(params): Json<AnnouncementParams>,
) -> Result<Json<AdminAnnouncementResponse>, AppError> {
    let result = build_announcement_service(&state)
        .create(params, Utc::now())
        .await
        .map(|announcement| {
            tracing::info!(
                admin_id = %admin.id,
                announcement_id = %announcement.id,
                "Admin created announcement"
            );
            Json(announcement.into())
        });

    record_request("POST", "/api/v1/admin/announcements", &result);
    result
}

/// PUT /api/v1/admin/announcements/:id
pub async fn update_announcement(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
    Path(id): Path<String>,
    Json(params): Json<AnnouncementParams>,
) -> Result<Json<AdminAnnouncementResponse>, AppError> {
    let result = build_announcement_service(&state)
        .update(&id, params, Utc::now())
        .await
        .map(|announcement| Json(announcement.into()));

    record_request("PUT", "/api/v1/admin/announcements/:id", &result);
    result
}

/// DELETE /api/v1/admin/announcements/:id
pub async fn delete_announcement(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let result = build_announcement_service(&state)
        .destroy(&id)
        .await
        .map(|()| StatusCode::OK);

    record_request("DELETE", "/api/v1/admin/announcements/:id", &result);
    result
}

/// POST /api/v1/admin/announcements/:id/publish
pub async fn publish_announcement(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
    Path(id): Path<String>,
) -> Result<Json<AdminAnnouncementResponse>, AppError> {
    let result = build_announcement_service(&state)
        .publish(&id, Utc::now())
        .await
        .map(|announcement| Json(announcement.into()));

    record_request("POST", "/api/v1/admin/announcements/:id/publish", &result);
    result
}

/// POST /api/v1/admin/announcements/:id/unpublish
pub async fn unpublish_announcement(
    State(state): State<AppState>,
    AdminAccount(_admin): AdminAccount,
    Path(id): Path<String>,
) -> Result<Json<AdminAnnouncementResponse>, AppError> {
    let result = build_announcement_service(&state)
        .unpublish(&id, Utc::now())
        .await
        .map(|announcement| Json(announcement.into()));

    record_request(
        "POST",
        "/api/v1/admin/announcements/:id/unpublish",
        &result,
    );
    result
}
