//! Status endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::{ReblogResponse, StatusReblogResponse, record_request};
use crate::AppState;
use crate::auth::CurrentAccount;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::ReblogService;

fn build_reblog_service(state: &AppState) -> ReblogService {
    ReblogService::new(state.db.clone())
}

/// POST /api/v1/statuses/:id/reblog
pub async fn reblog_status(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<ReblogResponse>, AppError> {
    const ENDPOINT: &str = "/api/v1/statuses/:id/reblog";
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", ENDPOINT])
        .start_timer();

    let reblog_service = build_reblog_service(&state);
    let result: Result<Json<ReblogResponse>, AppError> = async {
        reblog_service.create(&account, &id).await?;
        let state = reblog_service.state(&id, &account).await?;
        Ok(Json(ReblogResponse {
            reblog: state.into(),
        }))
    }
    .await;

    record_request("POST", ENDPOINT, &result);
    result
}

/// POST /api/v1/statuses/:id/unreblog
pub async fn unreblog_status(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<StatusReblogResponse>, AppError> {
    const ENDPOINT: &str = "/api/v1/statuses/:id/unreblog";
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", ENDPOINT])
        .start_timer();

    let reblog_service = build_reblog_service(&state);
    let result: Result<Json<StatusReblogResponse>, AppError> = async {
        reblog_service.destroy(&account, &id).await?;
        let state = reblog_service.state(&id, &account).await?;
        Ok(Json(state.into()))
    }
    .await;

    record_request("POST", ENDPOINT, &result);
    result
}
