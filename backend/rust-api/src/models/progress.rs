use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};

/// Base attempt budget per challenge.
pub const MAX_ATTEMPTS: u32 = 12;
/// Extra attempts unlocked by accepting the bonus offer.
pub const BONUS_ATTEMPTS: u32 = 1;
/// Attempts a player must have used before a hint can be requested.
pub const HINT_UNLOCK_ATTEMPTS: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Fresh,
    InProgress,
    Solved,
    Exhausted,
    BonusGranted,
}

/// One row per (player, challenge). Only the progress ledger mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(rename = "_id")]
    pub id: String,
    pub player_id: String,
    pub challenge_id: String,
    pub challenge_date: NaiveDate,
    pub attempts_count: u32,
    pub solved: bool,
    pub best_similarity: f64,
    pub score: u32,
    #[serde(default)]
    pub bonus_offered: bool,
    #[serde(default)]
    pub bonus_granted: bool,
    #[serde(default)]
    pub bonus_declined: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl Progress {
    pub fn new(player_id: &str, challenge_id: &str, challenge_date: NaiveDate, bonus_offered: bool) -> Self {
        Self {
            id: Self::key(player_id, challenge_id),
            player_id: player_id.to_string(),
            challenge_id: challenge_id.to_string(),
            challenge_date,
            attempts_count: 0,
            solved: false,
            best_similarity: 0.0,
            score: 0,
            bonus_offered,
            bonus_granted: false,
            bonus_declined: false,
            last_attempt_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(player_id: &str, challenge_id: &str) -> String {
        format!("{}:{}", player_id, challenge_id)
    }

    pub fn max_allowed(&self) -> u32 {
        MAX_ATTEMPTS + if self.bonus_granted { BONUS_ATTEMPTS } else { 0 }
    }

    pub fn attempt_allowed(&self) -> bool {
        !self.solved && self.attempts_count < self.max_allowed()
    }

    pub fn attempts_remaining(&self) -> u32 {
        if self.solved {
            return 0;
        }
        self.max_allowed().saturating_sub(self.attempts_count)
    }

    pub fn state(&self) -> ProgressState {
        if self.solved {
            ProgressState::Solved
        } else if self.attempts_count == 0 {
            ProgressState::Fresh
        } else if self.attempts_count < MAX_ATTEMPTS {
            ProgressState::InProgress
        } else if self.bonus_granted && self.attempts_count < self.max_allowed() {
            ProgressState::BonusGranted
        } else {
            ProgressState::Exhausted
        }
    }

    /// Exhausted at the base cap with an offer still open.
    pub fn bonus_pending(&self) -> bool {
        self.bonus_offered
            && !self.solved
            && !self.bonus_granted
            && !self.bonus_declined
            && self.attempts_count >= MAX_ATTEMPTS
    }

    /// Whether this row has used its offer, by accepting or declining.
    pub fn bonus_used(&self) -> bool {
        self.bonus_granted || self.bonus_declined
    }

    /// Completed rows count toward bonus eligibility on later challenges.
    pub fn is_completed(&self) -> bool {
        self.solved || self.attempts_count >= MAX_ATTEMPTS
    }

    /// The target word may be shown once the row is terminal.
    pub fn reveals_word(&self) -> bool {
        self.solved || (!self.attempt_allowed() && !self.bonus_pending())
    }

    pub fn hint_available(&self) -> bool {
        !self.solved && self.attempts_count >= HINT_UNLOCK_ATTEMPTS
    }

    pub fn attempts_until_hint(&self) -> u32 {
        HINT_UNLOCK_ATTEMPTS.saturating_sub(self.attempts_count)
    }
}
