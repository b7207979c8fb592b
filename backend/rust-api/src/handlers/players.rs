use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::GameResult,
    extractors::AppJson,
    models::game::{NicknameValidateRequest, NicknameValidateResponse, RecentAttemptView},
    services::{game_service::GameService, AppState},
};

pub async fn validate_nickname(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<NicknameValidateRequest>,
) -> GameResult<Json<NicknameValidateResponse>> {
    req.validate()?;

    let service = GameService::new(&state);
    let response = service
        .validate_nickname(&req.nickname, req.device_token.as_deref())
        .await?;

    Ok(Json(response))
}

pub async fn recent_attempts(
    State(state): State<Arc<AppState>>,
) -> GameResult<Json<Vec<RecentAttemptView>>> {
    let service = GameService::new(&state);
    Ok(Json(service.recent_attempts().await?))
}
