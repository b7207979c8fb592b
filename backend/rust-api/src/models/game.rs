use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{attempt::Attempt, progress::Progress, progress::ProgressState, Language};

/// Body of `POST /api/v1/guess`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GuessRequest {
    pub guess: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[validate(length(min = 8, max = 128))]
    #[serde(default)]
    pub device_token: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Shared shape for endpoints that only need to locate the caller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PlayerQuery {
    #[serde(default)]
    pub locale: Option<String>,
    #[validate(length(min = 8, max = 128))]
    #[serde(default)]
    pub device_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NicknameValidateRequest {
    pub nickname: String,
    #[validate(length(min = 8, max = 128))]
    #[serde(default)]
    pub device_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicknameValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a scored guess, assembled once for both player kinds.
#[derive(Debug, Clone, Serialize)]
pub struct GuessOutcome {
    pub correct: bool,
    pub similarity: f64,
    pub best_similarity: f64,
    pub score: u32,
    pub attempts_used: u32,
    pub attempts_remaining: u32,
    pub state: ProgressState,
    pub hint_available: bool,
    pub attempts_until_hint: u32,
    pub bonus_offer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_word: Option<String>,
    pub is_anonymous: bool,
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    pub guess: String,
    pub similarity: f64,
    pub language: Language,
    pub attempted_at: DateTime<Utc>,
}

impl From<&Attempt> for AttemptView {
    fn from(a: &Attempt) -> Self {
        Self {
            guess: a.guess_text.clone(),
            similarity: a.similarity,
            language: a.language,
            attempted_at: a.attempted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub attempts_used: u32,
    pub attempts_remaining: u32,
    pub max_attempts: u32,
    pub solved: bool,
    pub best_similarity: f64,
    pub score: u32,
    pub state: ProgressState,
    pub bonus_granted: bool,
    pub bonus_declined: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl From<&Progress> for ProgressView {
    fn from(p: &Progress) -> Self {
        Self {
            attempts_used: p.attempts_count,
            attempts_remaining: p.attempts_remaining(),
            max_attempts: p.max_allowed(),
            solved: p.solved,
            best_similarity: p.best_similarity,
            score: p.score,
            state: p.state(),
            bonus_granted: p.bonus_granted,
            bonus_declined: p.bonus_declined,
            last_attempt_at: p.last_attempt_at,
        }
    }
}

/// Response of `GET /api/v1/challenge`.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeStatus {
    pub challenge_id: String,
    pub date: NaiveDate,
    pub language: Language,
    pub word_length: usize,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressView>,
    pub attempts: Vec<AttemptView>,
    pub hint_available: bool,
    pub attempts_until_hint: u32,
    pub bonus_offer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_word: Option<String>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HintResponse {
    pub hint: String,
    pub attempts_used: u32,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BonusResponse {
    pub bonus_granted: bool,
    pub bonus_declined: bool,
    pub attempts_remaining: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_word: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentAttemptView {
    pub id: String,
    pub player_name: String,
    pub is_anonymous: bool,
    pub guess: String,
    pub language: Language,
    pub attempted_at: DateTime<Utc>,
}
