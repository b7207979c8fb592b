use std::sync::Arc;

use chrono::Utc;

use crate::error::{GameError, GameResult, PermissionDenied, StoreError};
use crate::metrics::{BONUS_DECISIONS_TOTAL, LEDGER_CONFLICTS_TOTAL};
use crate::models::{
    attempt::Attempt,
    challenge::Challenge,
    player::Player,
    progress::{Progress, MAX_ATTEMPTS},
    Language,
};
use crate::services::{bonus_policy, scoring::calculate_score};
use crate::store::GameStore;
use crate::utils::retry::{retry_async_if, RetryConfig};

/// A guess that has been scored and is ready to be committed.
#[derive(Debug, Clone)]
pub struct ScoredGuess {
    pub guess_text: String,
    pub similarity: f64,
    pub is_exact: bool,
    pub language: Language,
    pub source_address: String,
}

enum CommitError {
    Conflict,
    Game(GameError),
}

impl From<GameError> for CommitError {
    fn from(err: GameError) -> Self {
        CommitError::Game(err)
    }
}

impl From<StoreError> for CommitError {
    fn from(err: StoreError) -> Self {
        CommitError::Game(err.into())
    }
}

impl From<PermissionDenied> for CommitError {
    fn from(err: PermissionDenied) -> Self {
        CommitError::Game(err.into())
    }
}

impl CommitError {
    fn into_game_error(self, what: &str) -> GameError {
        match self {
            CommitError::Game(e) => e,
            CommitError::Conflict => {
                GameError::Internal(anyhow::anyhow!("{} kept conflicting with concurrent updates", what))
            }
        }
    }
}

/// Authoritative per (player, challenge) attempt state. Every mutation is a conditional
/// replace keyed on the row's current ledger fields, retried when another request won.
pub struct ProgressLedger {
    store: Arc<dyn GameStore>,
}

impl ProgressLedger {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, player_id: &str, challenge_id: &str) -> GameResult<Option<Progress>> {
        Ok(self.store.get_progress(player_id, challenge_id).await?)
    }

    /// Idempotent get-or-insert. The bonus offer is decided here, once per row.
    pub async fn load_or_create(&self, player: &Player, challenge: &Challenge) -> GameResult<Progress> {
        if let Some(existing) = self.store.get_progress(&player.id, &challenge.id).await? {
            return Ok(existing);
        }

        let completed = self
            .store
            .count_completed_challenges(&player.id, &challenge.id)
            .await?;
        let prior_uses = self.store.count_bonus_uses(&player.id, &challenge.id).await?;
        let offered = bonus_policy::should_offer(completed, prior_uses, &mut rand::rng());

        let progress = Progress::new(&player.id, &challenge.id, challenge.date, offered);
        match self.store.insert_progress(&progress).await {
            Ok(()) => {
                tracing::info!(
                    "Progress created: player={}, challenge={}, bonus_offered={}",
                    player.id,
                    challenge.id,
                    offered
                );
                Ok(progress)
            }
            Err(e) if e.is_duplicate_key() => self
                .store
                .get_progress(&player.id, &challenge.id)
                .await?
                .ok_or_else(|| GameError::Internal(anyhow::anyhow!("progress {} vanished", progress.id))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn check_attempt(progress: &Progress) -> Result<(), PermissionDenied> {
        if progress.solved {
            return Err(PermissionDenied::AlreadySolved);
        }
        if !progress.attempt_allowed() {
            return Err(PermissionDenied::NoAttemptsRemaining);
        }
        Ok(())
    }

    /// Applies one scored guess and appends it to the attempt log.
    ///
    /// Racing commits for the same row are serialized by the conditional update; a loser
    /// re-reads the row and re-checks permission, so the cap can never be exceeded.
    pub async fn commit_attempt(
        &self,
        player_id: &str,
        challenge: &Challenge,
        guess: &ScoredGuess,
    ) -> GameResult<Progress> {
        let committed = retry_async_if(
            RetryConfig::contention(),
            || self.try_commit(player_id, challenge, guess),
            |e| matches!(e, CommitError::Conflict),
        )
        .await
        .map_err(|e| e.into_game_error("attempt commit"))?;

        let attempt = Attempt {
            id: uuid::Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            challenge_id: challenge.id.clone(),
            word_id: challenge.word_id.clone(),
            guess_text: guess.guess_text.clone(),
            similarity: guess.similarity,
            is_exact: guess.is_exact,
            language: guess.language,
            source_address: guess.source_address.clone(),
            attempted_at: committed.last_attempt_at.unwrap_or_else(Utc::now),
        };
        self.store.insert_attempt(&attempt).await?;

        tracing::info!(
            "Attempt committed: player={}, challenge={}, attempt={}, similarity={:.4}, solved={}",
            player_id,
            challenge.id,
            committed.attempts_count,
            guess.similarity,
            committed.solved
        );
        Ok(committed)
    }

    async fn try_commit(
        &self,
        player_id: &str,
        challenge: &Challenge,
        guess: &ScoredGuess,
    ) -> Result<Progress, CommitError> {
        let current = self
            .store
            .get_progress(player_id, &challenge.id)
            .await?
            .ok_or_else(|| GameError::NotFound("Progress not found".to_string()))?;
        Self::check_attempt(&current)?;

        let mut next = current.clone();
        next.attempts_count += 1;
        next.solved = current.solved || guess.is_exact;
        next.best_similarity = current.best_similarity.max(guess.similarity);
        next.score = calculate_score(next.best_similarity, next.attempts_count);
        next.last_attempt_at = Some(Utc::now());

        self.swap(&current, &next).await
    }

    /// Extends the cap by one. A second grant is refused, never ignored.
    pub async fn grant_bonus(&self, player_id: &str, challenge_id: &str) -> GameResult<Progress> {
        let progress = retry_async_if(
            RetryConfig::contention(),
            || async {
                let current = self.current(player_id, challenge_id).await?;
                if current.bonus_used() {
                    return Err(PermissionDenied::BonusAlreadyUsed.into());
                }
                if !current.bonus_offered || current.solved || current.attempts_count < MAX_ATTEMPTS {
                    return Err(PermissionDenied::BonusNotEligible.into());
                }
                let mut next = current.clone();
                next.bonus_granted = true;
                self.swap(&current, &next).await
            },
            |e| matches!(e, CommitError::Conflict),
        )
        .await
        .map_err(|e| e.into_game_error("bonus grant"))?;

        BONUS_DECISIONS_TOTAL.with_label_values(&["accepted"]).inc();
        tracing::info!("Bonus granted: player={}, challenge={}", player_id, challenge_id);
        Ok(progress)
    }

    /// Marks the offer as used without extending the cap.
    pub async fn decline_bonus(&self, player_id: &str, challenge_id: &str) -> GameResult<Progress> {
        let progress = retry_async_if(
            RetryConfig::contention(),
            || async {
                let current = self.current(player_id, challenge_id).await?;
                if current.bonus_used() {
                    return Err(PermissionDenied::BonusAlreadyUsed.into());
                }
                if !current.bonus_offered {
                    return Err(PermissionDenied::BonusNotEligible.into());
                }
                let mut next = current.clone();
                next.bonus_declined = true;
                self.swap(&current, &next).await
            },
            |e| matches!(e, CommitError::Conflict),
        )
        .await
        .map_err(|e| e.into_game_error("bonus decline"))?;

        BONUS_DECISIONS_TOTAL.with_label_values(&["declined"]).inc();
        tracing::info!("Bonus declined: player={}, challenge={}", player_id, challenge_id);
        Ok(progress)
    }

    async fn current(&self, player_id: &str, challenge_id: &str) -> Result<Progress, CommitError> {
        Ok(self
            .store
            .get_progress(player_id, challenge_id)
            .await?
            .ok_or_else(|| GameError::NotFound("Progress not found".to_string()))?)
    }

    async fn swap(&self, current: &Progress, next: &Progress) -> Result<Progress, CommitError> {
        if self.store.compare_and_swap_progress(current, next).await? {
            Ok(next.clone())
        } else {
            LEDGER_CONFLICTS_TOTAL.inc();
            tracing::debug!("Progress {} changed concurrently, retrying", current.id);
            Err(CommitError::Conflict)
        }
    }
}
