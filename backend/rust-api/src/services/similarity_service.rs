use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::models::{word::Word, Language};
use crate::services::embedding_client::EmbeddingClient;
use crate::store::GameStore;
use crate::utils::text::normalize_text;

/// Scores guesses against a challenge's target word.
pub struct SimilarityService {
    store: Arc<dyn GameStore>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SimilarityService {
    pub fn new(store: Arc<dyn GameStore>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { store, embedder }
    }

    /// Accent, case and surrounding-whitespace insensitive equality with the target.
    pub fn is_exact_match(guess: &str, word: &Word, language: Language) -> bool {
        let guess = normalize_text(guess);
        !guess.is_empty() && guess == normalize_text(word.text(language))
    }

    /// Similarity in [0, 1] between the guess and the target vector for `language`.
    ///
    /// Embedding failures are hard errors. A missing target vector or a store failure
    /// during comparison degrades to 0.
    pub async fn score(&self, guess: &str, word: &Word, language: Language) -> GameResult<f64> {
        let normalized = normalize_text(guess);
        let embedding = self.embedder.embed(&normalized).await.map_err(|e| {
            tracing::error!("Embedding failed for guess on word {}: {}", word.id, e);
            GameError::Dependency(format!("embedding unavailable: {}", e))
        })?;

        let similarity = match self
            .store
            .target_similarity(&word.id, language, &embedding)
            .await
        {
            Ok(Some(similarity)) => similarity,
            Ok(None) => {
                tracing::warn!(
                    "No usable {} target vector for word {}, scoring 0",
                    language.as_str(),
                    word.id
                );
                0.0
            }
            Err(e) => {
                tracing::warn!("Vector comparison failed for word {}: {}, scoring 0", word.id, e);
                0.0
            }
        };

        Ok(if similarity.is_finite() {
            similarity.clamp(0.0, 1.0)
        } else {
            0.0
        })
    }
}
