use std::sync::Arc;

use crate::error::{GameResult, PermissionDenied};
use crate::metrics::{record_generation, HINTS_REQUESTED_TOTAL};
use crate::models::{
    challenge::Challenge, game::HintResponse, progress::Progress, word::Word, Language,
};
use crate::services::text_generator::{GenerationRequest, TextGenerator};
use crate::store::GameStore;
use crate::utils::text::normalize_text;

/// Lazily generated, permanently cached hints per (challenge, language).
pub struct HintService {
    store: Arc<dyn GameStore>,
    generator: Arc<dyn TextGenerator>,
}

impl HintService {
    pub fn new(store: Arc<dyn GameStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn check_unlocked(progress: &Progress) -> Result<(), PermissionDenied> {
        if progress.solved {
            return Err(PermissionDenied::HintAfterSolve);
        }
        if !progress.hint_available() {
            return Err(PermissionDenied::HintLocked {
                remaining: progress.attempts_until_hint(),
            });
        }
        Ok(())
    }

    pub async fn request_hint(
        &self,
        progress: &Progress,
        challenge: &Challenge,
        word: &Word,
        language: Language,
    ) -> GameResult<HintResponse> {
        Self::check_unlocked(progress)?;

        if let Some(cached) = challenge.hint(language) {
            tracing::debug!("Using cached hint for challenge {} ({})", challenge.id, language.as_str());
            HINTS_REQUESTED_TOTAL.with_label_values(&["cache"]).inc();
            return Ok(HintResponse {
                hint: cached.to_string(),
                attempts_used: progress.attempts_count,
                cached: true,
            });
        }

        let Some(generated) = self.generate(word, language).await else {
            HINTS_REQUESTED_TOTAL.with_label_values(&["fallback"]).inc();
            return Ok(HintResponse {
                hint: fallback_hint(language, word.text(language)),
                attempts_used: progress.attempts_count,
                cached: false,
            });
        };

        // First writer wins; a concurrent request may already have stored its own text.
        let stored = self
            .store
            .set_challenge_hint_if_absent(&challenge.id, language, &generated)
            .await?
            .unwrap_or(generated);

        HINTS_REQUESTED_TOTAL.with_label_values(&["generated"]).inc();
        tracing::info!("Hint cached for challenge {} ({})", challenge.id, language.as_str());
        Ok(HintResponse {
            hint: stored,
            attempts_used: progress.attempts_count,
            cached: false,
        })
    }

    async fn generate(&self, word: &Word, language: Language) -> Option<String> {
        let target = word.text(language);
        let request = match language {
            Language::En => GenerationRequest {
                system: "You write subtle clues for a word guessing game. Never say the word itself."
                    .to_string(),
                user: format!(
                    "Write a clue for the word \"{}\" in English: at most two short sentences \
                     about its traits, uses or associations. Reply with the clue only.",
                    target
                ),
                temperature: 0.8,
                max_tokens: 100,
                json: false,
            },
            Language::Es => GenerationRequest {
                system: "Escribes pistas sutiles para un juego de adivinar palabras. Nunca digas la palabra."
                    .to_string(),
                user: format!(
                    "Escribe una pista para la palabra \"{}\" en español: máximo dos oraciones cortas \
                     sobre sus características, usos o asociaciones. Responde solo con la pista.",
                    target
                ),
                temperature: 0.8,
                max_tokens: 100,
                json: false,
            },
        };

        match self.generator.generate(&request).await {
            Ok(hint) if !hint.trim().is_empty() && !reveals(&hint, target) => {
                record_generation("hint", "ok");
                Some(hint.trim().to_string())
            }
            Ok(_) => {
                record_generation("hint", "rejected");
                tracing::warn!("Generated hint for word {} was empty or revealed it", word.id);
                None
            }
            Err(e) => {
                record_generation("hint", "error");
                tracing::warn!("Hint generation failed for word {}: {}", word.id, e);
                None
            }
        }
    }
}

fn reveals(hint: &str, target: &str) -> bool {
    let target = normalize_text(target);
    !target.is_empty()
        && normalize_text(hint)
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == target)
}

fn fallback_hint(language: Language, target: &str) -> String {
    let letters = target.chars().count();
    let first = target.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
    match language {
        Language::En => format!("The word has {} letters and starts with \"{}\".", letters, first),
        Language::Es => format!("La palabra tiene {} letras y empieza por \"{}\".", letters, first),
    }
}
