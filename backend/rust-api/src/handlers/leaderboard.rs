use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

use crate::{
    error::{GameError, GameResult},
    models::{
        leaderboard::{DayLeaderboard, DayLeaderboardQuery, GlobalLeaderboard, GlobalLeaderboardQuery},
        Language,
    },
    services::{leaderboard_service::LeaderboardService, AppState},
    utils::time::today_utc,
};

const MAX_DAYS_AGO: u32 = 366;

pub async fn day_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayLeaderboardQuery>,
) -> GameResult<Json<DayLeaderboard>> {
    let today = today_utc();
    let date = resolve_date(&query, today)?;
    let language = Language::from_locale(query.locale.as_deref());
    tracing::info!("Day leaderboard requested for {}", date);

    let service = LeaderboardService::new(state.store.clone());
    Ok(Json(service.day(date, today, language).await?))
}

pub async fn global_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GlobalLeaderboardQuery>,
) -> GameResult<Json<GlobalLeaderboard>> {
    let service = LeaderboardService::new(state.store.clone());
    Ok(Json(service.global(query.metric).await?))
}

/// An explicit date wins over `days_ago`; neither means today. Future dates are refused.
fn resolve_date(query: &DayLeaderboardQuery, today: NaiveDate) -> GameResult<NaiveDate> {
    let date = match (query.date, query.days_ago) {
        (Some(date), _) => date,
        (None, Some(days)) if days > MAX_DAYS_AGO => {
            return Err(GameError::validation(format!(
                "days_ago must be at most {}",
                MAX_DAYS_AGO
            )))
        }
        (None, Some(days)) => today - Duration::days(i64::from(days)),
        (None, None) => today,
    };

    if date > today {
        return Err(GameError::validation("Leaderboards for future days do not exist"));
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn defaults_to_today() {
        let query = DayLeaderboardQuery::default();
        assert_eq!(resolve_date(&query, today()).unwrap(), today());
    }

    #[test]
    fn days_ago_counts_back() {
        let query = DayLeaderboardQuery {
            days_ago: Some(2),
            ..Default::default()
        };
        assert_eq!(
            resolve_date(&query, today()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()
        );
    }

    #[test]
    fn rejects_future_and_distant_dates() {
        let future = DayLeaderboardQuery {
            date: NaiveDate::from_ymd_opt(2026, 3, 11),
            ..Default::default()
        };
        assert!(resolve_date(&future, today()).is_err());

        let distant = DayLeaderboardQuery {
            days_ago: Some(MAX_DAYS_AGO + 1),
            ..Default::default()
        };
        assert!(resolve_date(&distant, today()).is_err());
    }
}
