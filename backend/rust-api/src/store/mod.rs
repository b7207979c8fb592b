use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::models::{
    attempt::Attempt,
    ban::BanRecord,
    challenge::Challenge,
    leaderboard::{GlobalMetric, PlayerTotals},
    player::Player,
    progress::Progress,
    word::Word,
    Language,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for the game engine. Implementations must enforce the same
/// uniqueness rules: one challenge per date, one progress row per (player, challenge),
/// unique device tokens and unique anonymous nickname keys, one ban per address.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // words
    async fn insert_word(&self, word: &Word) -> StoreResult<()>;
    async fn get_word(&self, word_id: &str) -> StoreResult<Option<Word>>;
    async fn find_word_by_text(&self, text_en: &str, text_es: &str) -> StoreResult<Option<Word>>;
    /// Ids of words with both embeddings present, minus `excluding`.
    async fn eligible_word_ids(&self, excluding: &[String]) -> StoreResult<Vec<String>>;
    /// Every known target word in both languages.
    async fn all_word_texts(&self) -> StoreResult<Vec<String>>;
    /// Cosine similarity between `embedding` and the stored target vector for `language`.
    /// `None` when the word or its vector is missing.
    async fn target_similarity(
        &self,
        word_id: &str,
        language: Language,
        embedding: &[f32],
    ) -> StoreResult<Option<f64>>;

    // challenges
    async fn challenge_for_date(&self, date: NaiveDate) -> StoreResult<Option<Challenge>>;
    async fn get_challenge(&self, challenge_id: &str) -> StoreResult<Option<Challenge>>;
    /// Word ids of the latest `limit` challenges, newest first.
    async fn recent_challenge_word_ids(&self, limit: usize) -> StoreResult<Vec<String>>;
    /// Fails with `DuplicateKey` when a challenge already exists for the date.
    async fn insert_challenge(&self, challenge: &Challenge) -> StoreResult<()>;
    /// Stores the hint only if none is cached yet; returns the hint now on record.
    async fn set_challenge_hint_if_absent(
        &self,
        challenge_id: &str,
        language: Language,
        hint: &str,
    ) -> StoreResult<Option<String>>;

    // players
    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>>;
    async fn find_player_by_device(&self, device_token: &str) -> StoreResult<Option<Player>>;
    async fn find_anonymous_by_nickname_key(&self, key: &str) -> StoreResult<Option<Player>>;
    async fn insert_player(&self, player: &Player) -> StoreResult<()>;
    async fn players_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Player>>;

    // progress
    async fn get_progress(&self, player_id: &str, challenge_id: &str) -> StoreResult<Option<Progress>>;
    async fn insert_progress(&self, progress: &Progress) -> StoreResult<()>;
    /// Replaces the row with `next` only if it still matches `expected` on
    /// attempts/solved/bonus fields. Returns false when another writer got there first.
    async fn compare_and_swap_progress(&self, expected: &Progress, next: &Progress) -> StoreResult<bool>;
    /// Rows for the challenge of `date` with at least one attempt.
    async fn progress_for_date(&self, date: NaiveDate) -> StoreResult<Vec<Progress>>;
    /// Sums of played rows grouped by player, best `limit` players by `metric` first.
    /// With `GlobalMetric::Solved`, players without a solved row are left out.
    async fn player_totals(&self, metric: GlobalMetric, limit: usize) -> StoreResult<Vec<PlayerTotals>>;
    /// Solved or exhausted rows of the player, ignoring `excluding_challenge`.
    async fn count_completed_challenges(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64>;
    /// Rows where the player accepted or declined a bonus, ignoring `excluding_challenge`.
    async fn count_bonus_uses(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64>;

    // attempts
    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()>;
    /// Newest first.
    async fn attempts_for(&self, player_id: &str, challenge_id: &str) -> StoreResult<Vec<Attempt>>;
    async fn count_attempts_from_address_since(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<u64>;
    async fn recent_attempts(&self, limit: usize) -> StoreResult<Vec<Attempt>>;

    // bans
    async fn get_ban(&self, address: &str) -> StoreResult<Option<BanRecord>>;
    async fn upsert_ban(&self, ban: &BanRecord) -> StoreResult<()>;
    async fn delete_expired_bans(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
