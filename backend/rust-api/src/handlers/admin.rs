use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::GameResult,
    services::{abuse_guard::AbuseGuard, AppState},
};

#[derive(Debug, Serialize)]
pub struct BanCleanupResponse {
    pub removed: u64,
}

/// Removes expired ban records on demand; the sweeper binary does the same on a timer.
pub async fn cleanup_bans(State(state): State<Arc<AppState>>) -> GameResult<Json<BanCleanupResponse>> {
    let guard = AbuseGuard::new(state.store.clone(), state.config.abuse.clone());
    let removed = guard.sweep_expired_bans(Utc::now()).await?;
    tracing::info!("Admin ban cleanup removed {} records", removed);
    Ok(Json(BanCleanupResponse { removed }))
}
