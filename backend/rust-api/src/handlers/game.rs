use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::GameResult,
    extractors::{AppJson, ClientIp},
    middlewares::auth::JwtClaims,
    models::game::{
        BonusResponse, ChallengeStatus, GuessOutcome, GuessRequest, HintResponse, PlayerQuery,
    },
    services::{game_service::GameService, identity_service::IdentityRequest, AppState},
};

fn identity<'a>(
    claims: &'a Option<Extension<JwtClaims>>,
    device_token: Option<&'a str>,
    nickname: Option<&'a str>,
) -> IdentityRequest<'a> {
    IdentityRequest {
        claims: claims.as_ref().map(|Extension(c)| c),
        device_token,
        nickname,
    }
}

pub async fn submit_guess(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    ClientIp(client_ip): ClientIp,
    AppJson(req): AppJson<GuessRequest>,
) -> GameResult<Json<GuessOutcome>> {
    req.validate()?;
    tracing::info!(
        "Guess from {} (registered: {})",
        client_ip,
        claims.is_some()
    );

    let service = GameService::new(&state);
    let outcome = service
        .submit_guess(
            &req,
            identity(&claims, req.device_token.as_deref(), req.nickname.as_deref()),
            &client_ip,
        )
        .await?;

    Ok(Json(outcome))
}

pub async fn get_challenge(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    Query(query): Query<PlayerQuery>,
) -> GameResult<Json<ChallengeStatus>> {
    query.validate()?;

    let service = GameService::new(&state);
    let status = service
        .challenge_status(
            query.locale.as_deref(),
            identity(&claims, query.device_token.as_deref(), None),
        )
        .await?;

    Ok(Json(status))
}

pub async fn request_hint(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    AppJson(req): AppJson<PlayerQuery>,
) -> GameResult<Json<HintResponse>> {
    req.validate()?;
    tracing::info!("Hint requested");

    let service = GameService::new(&state);
    let hint = service
        .request_hint(
            req.locale.as_deref(),
            identity(&claims, req.device_token.as_deref(), None),
        )
        .await?;

    Ok(Json(hint))
}

pub async fn accept_bonus(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    AppJson(req): AppJson<PlayerQuery>,
) -> GameResult<Json<BonusResponse>> {
    req.validate()?;
    tracing::info!("Bonus accepted");

    let service = GameService::new(&state);
    let response = service
        .accept_bonus(
            req.locale.as_deref(),
            identity(&claims, req.device_token.as_deref(), None),
        )
        .await?;

    Ok(Json(response))
}

pub async fn decline_bonus(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    AppJson(req): AppJson<PlayerQuery>,
) -> GameResult<Json<BonusResponse>> {
    req.validate()?;
    tracing::info!("Bonus declined");

    let service = GameService::new(&state);
    let response = service
        .decline_bonus(
            req.locale.as_deref(),
            identity(&claims, req.device_token.as_deref(), None),
        )
        .await?;

    Ok(Json(response))
}
