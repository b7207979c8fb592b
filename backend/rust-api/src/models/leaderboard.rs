use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayLeaderboardQuery {
    #[serde(default)]
    pub days_ago: Option<u32>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalMetric {
    #[default]
    Solved,
    Score,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalLeaderboardQuery {
    #[serde(default)]
    pub metric: GlobalMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayEntry {
    pub rank: u32,
    pub player_name: String,
    pub is_anonymous: bool,
    pub solved: bool,
    pub score: u32,
    pub attempts: u32,
    pub best_similarity: f64,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayLeaderboard {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    pub entries: Vec<DayEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalEntry {
    pub rank: u32,
    pub player_name: String,
    pub is_anonymous: bool,
    pub solved_count: u32,
    pub total_score: u64,
    pub challenges_played: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalLeaderboard {
    pub metric: GlobalMetric,
    pub entries: Vec<GlobalEntry>,
}

/// Per-player sums over played progress rows, as produced by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerTotals {
    #[serde(rename = "_id")]
    pub player_id: String,
    pub solved_count: u32,
    pub total_score: u64,
    pub challenges_played: u32,
}

impl GlobalMetric {
    /// Sort key for `totals`, highest first.
    pub fn primary(self, solved_count: u32, total_score: u64) -> u64 {
        match self {
            GlobalMetric::Solved => u64::from(solved_count),
            GlobalMetric::Score => total_score,
        }
    }

    pub fn secondary(self, solved_count: u32, total_score: u64) -> u64 {
        match self {
            GlobalMetric::Solved => total_score,
            GlobalMetric::Score => u64::from(solved_count),
        }
    }

    /// Field names of the primary and secondary keys in a [`PlayerTotals`] document.
    pub fn sort_fields(self) -> (&'static str, &'static str) {
        match self {
            GlobalMetric::Solved => ("solved_count", "total_score"),
            GlobalMetric::Score => ("total_score", "solved_count"),
        }
    }
}
