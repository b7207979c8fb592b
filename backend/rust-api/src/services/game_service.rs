use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GameError, GameResult, PermissionDenied};
use crate::metrics::record_guess;
use crate::models::{
    challenge::Challenge,
    game::{
        AttemptView, BonusResponse, ChallengeStatus, GuessOutcome, GuessRequest, HintResponse,
        NicknameValidateResponse, ProgressView, RecentAttemptView,
    },
    player::Player,
    progress::{Progress, HINT_UNLOCK_ATTEMPTS},
    word::Word,
    Language,
};
use crate::services::{
    abuse_guard::AbuseGuard,
    challenge_service::ChallengeService,
    hint_service::HintService,
    identity_service::{IdentityRequest, IdentityService},
    progress_service::{ProgressLedger, ScoredGuess},
    similarity_service::SimilarityService,
    text_policy::TextPolicy,
    AppState,
};
use crate::store::GameStore;

pub const RECENT_ATTEMPTS_LIMIT: usize = 20;

/// Entry point for gameplay requests; wires the engine components per request.
pub struct GameService {
    store: Arc<dyn GameStore>,
    policy: Arc<TextPolicy>,
    abuse: AbuseGuard,
    identity: IdentityService,
    challenges: ChallengeService,
    oracle: SimilarityService,
    ledger: ProgressLedger,
    hints: HintService,
}

impl GameService {
    pub fn new(state: &AppState) -> Self {
        let store = state.store.clone();
        Self {
            policy: state.text_policy.clone(),
            abuse: AbuseGuard::new(store.clone(), state.config.abuse.clone()),
            identity: IdentityService::new(store.clone(), state.text_policy.clone()),
            challenges: ChallengeService::new(store.clone(), state.generator.clone()),
            oracle: SimilarityService::new(store.clone(), state.embedder.clone()),
            ledger: ProgressLedger::new(store.clone()),
            hints: HintService::new(store.clone(), state.generator.clone()),
            store,
        }
    }

    /// Scores one guess for today's challenge.
    ///
    /// The abuse guard runs before anything is written, and the permission check runs
    /// before the embedding call so refused requests cost nothing.
    ///
    /// An exact match is recorded with similarity 1.0 and never reaches the embedding
    /// service, so its `best_similarity` and `score` are the maximum rather than whatever
    /// the embedding of the guess would have produced.
    pub async fn submit_guess(
        &self,
        request: &GuessRequest,
        identity: IdentityRequest<'_>,
        source_address: &str,
    ) -> GameResult<GuessOutcome> {
        self.abuse.check_and_record(source_address).await?;

        let guess = self.policy.validate_guess(&request.guess)?;
        let language = Language::from_locale(request.locale.as_deref());

        let player = self.identity.resolve_or_create(identity).await?;
        let challenge = self.challenges.get_or_create_today().await?;
        let word = self.word_for(&challenge).await?;

        let progress = self.ledger.load_or_create(&player, &challenge).await?;
        ProgressLedger::check_attempt(&progress)?;

        let is_exact = SimilarityService::is_exact_match(&guess, &word, language);
        let similarity = if is_exact {
            1.0
        } else {
            self.oracle.score(&guess, &word, language).await?
        };

        let committed = self
            .ledger
            .commit_attempt(
                &player.id,
                &challenge,
                &ScoredGuess {
                    guess_text: guess,
                    similarity,
                    is_exact,
                    language,
                    source_address: source_address.to_string(),
                },
            )
            .await?;
        record_guess(is_exact, similarity);

        Ok(assemble_outcome(&player, &committed, &word, language, similarity, is_exact))
    }

    /// Today's challenge as seen by the caller. Known players get their progress row
    /// created on first view; unknown callers get an empty view.
    pub async fn challenge_status(
        &self,
        locale: Option<&str>,
        identity: IdentityRequest<'_>,
    ) -> GameResult<ChallengeStatus> {
        let language = Language::from_locale(locale);
        let challenge = self.challenges.get_or_create_today().await?;
        let word = self.word_for(&challenge).await?;

        let player = self.identity.resolve_existing(identity).await?;
        let (progress, attempts) = match &player {
            Some(player) => {
                let progress = self.ledger.load_or_create(player, &challenge).await?;
                let attempts = self.store.attempts_for(&player.id, &challenge.id).await?;
                (Some(progress), attempts)
            }
            None => (None, Vec::new()),
        };

        Ok(ChallengeStatus {
            challenge_id: challenge.id.clone(),
            date: challenge.date,
            language,
            word_length: word.text(language).chars().count(),
            category: challenge.category(language).to_string(),
            progress: progress.as_ref().map(ProgressView::from),
            attempts: attempts.iter().map(AttemptView::from).collect(),
            hint_available: progress.as_ref().is_some_and(Progress::hint_available),
            attempts_until_hint: progress
                .as_ref()
                .map_or(HINT_UNLOCK_ATTEMPTS, Progress::attempts_until_hint),
            bonus_offer: progress.as_ref().is_some_and(Progress::bonus_pending),
            revealed_word: progress
                .as_ref()
                .and_then(|p| revealed_word(p, &word, language)),
            is_anonymous: player.as_ref().map_or(true, Player::is_anonymous),
        })
    }

    pub async fn request_hint(
        &self,
        locale: Option<&str>,
        identity: IdentityRequest<'_>,
    ) -> GameResult<HintResponse> {
        let language = Language::from_locale(locale);
        let challenge = self.challenges.get_or_create_today().await?;
        let locked = PermissionDenied::HintLocked {
            remaining: HINT_UNLOCK_ATTEMPTS,
        };

        let Some(player) = self.identity.resolve_existing(identity).await? else {
            return Err(locked.into());
        };
        let Some(progress) = self.ledger.load(&player.id, &challenge.id).await? else {
            return Err(locked.into());
        };
        let word = self.word_for(&challenge).await?;

        self.hints
            .request_hint(&progress, &challenge, &word, language)
            .await
    }

    pub async fn accept_bonus(
        &self,
        locale: Option<&str>,
        identity: IdentityRequest<'_>,
    ) -> GameResult<BonusResponse> {
        let (player, challenge) = self.bonus_target(identity).await?;
        let progress = self.ledger.grant_bonus(&player.id, &challenge.id).await?;
        self.bonus_response(&progress, &challenge, Language::from_locale(locale))
            .await
    }

    pub async fn decline_bonus(
        &self,
        locale: Option<&str>,
        identity: IdentityRequest<'_>,
    ) -> GameResult<BonusResponse> {
        let (player, challenge) = self.bonus_target(identity).await?;
        let progress = self.ledger.decline_bonus(&player.id, &challenge.id).await?;
        self.bonus_response(&progress, &challenge, Language::from_locale(locale))
            .await
    }

    pub async fn validate_nickname(
        &self,
        nickname: &str,
        device_token: Option<&str>,
    ) -> GameResult<NicknameValidateResponse> {
        match self.identity.check_nickname(nickname, device_token).await {
            Ok(()) => Ok(NicknameValidateResponse {
                valid: true,
                error: None,
            }),
            Err(GameError::Validation(reason)) => Ok(NicknameValidateResponse {
                valid: false,
                error: Some(reason),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn recent_attempts(&self) -> GameResult<Vec<RecentAttemptView>> {
        let attempts = self.store.recent_attempts(RECENT_ATTEMPTS_LIMIT).await?;
        let mut ids: Vec<String> = attempts.iter().map(|a| a.player_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let players: HashMap<String, Player> = self
            .store
            .players_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(attempts
            .into_iter()
            .map(|a| {
                let player = players.get(&a.player_id);
                RecentAttemptView {
                    id: a.id,
                    player_name: player
                        .map(Player::public_name)
                        .unwrap_or_else(|| "Anonymous".to_string()),
                    is_anonymous: player.map_or(true, Player::is_anonymous),
                    guess: a.guess_text,
                    language: a.language,
                    attempted_at: a.attempted_at,
                }
            })
            .collect())
    }

    async fn word_for(&self, challenge: &Challenge) -> GameResult<Word> {
        self.store
            .get_word(&challenge.word_id)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("Word for challenge {} not found", challenge.id)))
    }

    async fn bonus_target(&self, identity: IdentityRequest<'_>) -> GameResult<(Player, Challenge)> {
        let challenge = self.challenges.get_or_create_today().await?;
        let player = self
            .identity
            .resolve_existing(identity)
            .await?
            .ok_or(PermissionDenied::BonusNotEligible)?;
        Ok((player, challenge))
    }

    async fn bonus_response(
        &self,
        progress: &Progress,
        challenge: &Challenge,
        language: Language,
    ) -> GameResult<BonusResponse> {
        let word = self.word_for(challenge).await?;
        Ok(BonusResponse {
            bonus_granted: progress.bonus_granted,
            bonus_declined: progress.bonus_declined,
            attempts_remaining: progress.attempts_remaining(),
            max_attempts: progress.max_allowed(),
            revealed_word: revealed_word(progress, &word, language),
        })
    }
}

fn revealed_word(progress: &Progress, word: &Word, language: Language) -> Option<String> {
    progress
        .reveals_word()
        .then(|| word.text(language).to_string())
}

/// Single shape for guess results, whichever kind of player made them.
fn assemble_outcome(
    player: &Player,
    progress: &Progress,
    word: &Word,
    language: Language,
    similarity: f64,
    correct: bool,
) -> GuessOutcome {
    GuessOutcome {
        correct,
        similarity,
        best_similarity: progress.best_similarity,
        score: progress.score,
        attempts_used: progress.attempts_count,
        attempts_remaining: progress.attempts_remaining(),
        state: progress.state(),
        hint_available: progress.hint_available(),
        attempts_until_hint: progress.attempts_until_hint(),
        bonus_offer: progress.bonus_pending(),
        revealed_word: revealed_word(progress, word, language),
        is_anonymous: player.is_anonymous(),
        player_name: player.public_name(),
    }
}
