//! Announcement endpoints for viewers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;

use super::{AnnouncementResponse, record_request};
use crate::AppState;
use crate::auth::{CurrentAccount, MaybeAccount};
use crate::error::AppError;
use crate::service::AnnouncementService;

pub(super) fn build_announcement_service(state: &AppState) -> AnnouncementService {
    AnnouncementService::new(state.db.clone())
}

/// GET /api/v1/announcements
///
/// Active published announcements, oldest first. `read` is only reported
/// to authenticated viewers.
pub async fn list_announcements(
    State(state): State<AppState>,
    MaybeAccount(account): MaybeAccount,
) -> Result<Json<Vec<AnnouncementResponse>>, AppError> {
    let result = build_announcement_service(&state)
        .list_active(account.as_ref(), Utc::now())
        .await
        .map(|views| {
            Json(
                views
                    .into_iter()
                    .map(|view| AnnouncementResponse::from_view(view, account.is_some()))
                    .collect(),
            )
        });

    record_request("GET", "/api/v1/announcements", &result);
    result
}

/// POST /api/v1/announcements/:id/dismiss
pub async fn dismiss_announcement(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = build_announcement_service(&state)
        .dismiss(&id, &account)
        .await
        .map(|()| Json(serde_json::json!({})));

    record_request("POST", "/api/v1/announcements/:id/dismiss", &result);
    result
}

/// PUT /api/v1/announcements/:id/reactions/:name
pub async fn add_reaction(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path((id, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let result = build_announcement_service(&state)
        .add_reaction(&id, &account, &name)
        .await
        .map(|()| StatusCode::OK);

    record_request("PUT", "/api/v1/announcements/:id/reactions/:name", &result);
    result
}

/// DELETE /api/v1/announcements/:id/reactions/:name
pub async fn remove_reaction(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path((id, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let result = build_announcement_service(&state)
        .remove_reaction(&id, &account, &name)
        .await
        .map(|()| StatusCode::OK);

    record_request(
        "DELETE",
        "/api/v1/announcements/:id/reactions/:name",
        &result,
    );
    result
}
