use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;

use crate::error::{GameError, GameResult};
use crate::metrics::{record_generation, CHALLENGES_CREATED_TOTAL};
use crate::models::{challenge::Challenge, word::Word};
use crate::services::text_generator::{GenerationRequest, TextGenerator};
use crate::store::GameStore;
use crate::utils::{text::normalize_text, time::today_utc};

/// Number of most recent challenges whose words are excluded from selection.
pub const RECENT_WINDOW: usize = 20;
pub const FALLBACK_CATEGORY: &str = "general";

#[derive(Debug, Deserialize)]
struct CategoryReply {
    #[serde(default)]
    category_en: Option<String>,
    #[serde(default)]
    category_es: Option<String>,
}

/// Picks and persists the one challenge of each UTC day.
pub struct ChallengeService {
    store: Arc<dyn GameStore>,
    generator: Arc<dyn TextGenerator>,
}

impl ChallengeService {
    pub fn new(store: Arc<dyn GameStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn get_or_create_today(&self) -> GameResult<Challenge> {
        self.get_or_create_for(today_utc()).await
    }

    /// Returns the challenge for `date`, creating it if this is the first request of the day.
    /// A concurrent creator that loses the insert race reads the winner's row.
    pub async fn get_or_create_for(&self, date: NaiveDate) -> GameResult<Challenge> {
        if let Some(existing) = self.store.challenge_for_date(date).await? {
            return Ok(existing);
        }

        let word = self.pick_word().await?;
        let (category_en, category_es) = self.generate_categories(&word).await;

        let challenge = Challenge {
            id: uuid::Uuid::new_v4().to_string(),
            word_id: word.id.clone(),
            date,
            category_en,
            category_es,
            hint_en: None,
            hint_es: None,
            created_at: Utc::now(),
        };

        match self.store.insert_challenge(&challenge).await {
            Ok(()) => {
                CHALLENGES_CREATED_TOTAL.inc();
                tracing::info!(
                    "Challenge created: date={}, challenge={}, word={}",
                    date,
                    challenge.id,
                    word.id
                );
                Ok(challenge)
            }
            Err(e) if e.is_duplicate_key() => {
                tracing::debug!("Lost challenge creation race for {}, reading winner", date);
                self.store
                    .challenge_for_date(date)
                    .await?
                    .ok_or_else(|| GameError::Internal(anyhow::anyhow!("challenge for {} vanished", date)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pick_word(&self) -> GameResult<Word> {
        let recent = self.store.recent_challenge_word_ids(RECENT_WINDOW).await?;
        let mut candidates = self.store.eligible_word_ids(&recent).await?;
        if candidates.is_empty() {
            tracing::warn!(
                "All eligible words used in the last {} challenges, selecting from full catalog",
                RECENT_WINDOW
            );
            candidates = self.store.eligible_word_ids(&[]).await?;
        }
        if candidates.is_empty() {
            return Err(GameError::NotFound("No eligible words available".to_string()));
        }

        let index = rand::rng().random_range(0..candidates.len());
        let word_id = &candidates[index];
        self.store
            .get_word(word_id)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("Word {} not found", word_id)))
    }

    async fn generate_categories(&self, word: &Word) -> (String, String) {
        let request = GenerationRequest {
            system: "You classify words for a guessing game. Reply with a broad category of one or \
                     two words that narrows the search without giving the word away. The category \
                     must never be the word itself."
                .to_string(),
            user: format!(
                "English word: \"{}\"\nSpanish word: \"{}\"\n\
                 Reply as JSON: {{\"category_en\": \"...\", \"category_es\": \"...\"}}. \
                 Neither category may equal the word.",
                word.text_en, word.text_es
            ),
            temperature: 0.3,
            max_tokens: 50,
            json: true,
        };

        let reply = match self.generator.generate(&request).await {
            Ok(text) => serde_json::from_str::<CategoryReply>(&text).ok(),
            Err(e) => {
                tracing::warn!("Category generation failed for word {}: {}", word.id, e);
                None
            }
        };
        record_generation("category", if reply.is_some() { "ok" } else { "fallback" });

        let reply = reply.unwrap_or(CategoryReply {
            category_en: None,
            category_es: None,
        });
        (
            sanitize_category(reply.category_en, &word.text_en),
            sanitize_category(reply.category_es, &word.text_es),
        )
    }
}

/// Falls back to the generic label when the category is empty or equals the target.
fn sanitize_category(category: Option<String>, target: &str) -> String {
    match category.map(|c| c.trim().to_string()) {
        Some(c) if !c.is_empty() && normalize_text(&c) != normalize_text(target) => c,
        _ => FALLBACK_CATEGORY.to_string(),
    }
}
