use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::models::word::Word;
use crate::services::embedding_client::EmbeddingClient;
use crate::store::GameStore;
use crate::utils::text::normalize_text;

/// One catalog row: Spanish first, English second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPair {
    pub text_es: String,
    pub text_en: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Parses `spanish,english` lines. Blank lines and `#` comments are ignored, as is a
/// leading `spanish,english` header.
pub fn parse_word_csv(input: &str) -> Result<Vec<WordPair>> {
    let mut pairs = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns = line.split(',').map(|c| c.trim().trim_matches('"').trim());
        let (Some(es), Some(en), None) = (columns.next(), columns.next(), columns.next()) else {
            bail!("line {}: expected exactly two columns", index + 1);
        };

        if index == 0 && es.eq_ignore_ascii_case("spanish") && en.eq_ignore_ascii_case("english") {
            continue;
        }
        if es.is_empty() || en.is_empty() {
            bail!("line {}: empty word", index + 1);
        }

        pairs.push(WordPair {
            text_es: es.to_lowercase(),
            text_en: en.to_lowercase(),
        });
    }

    Ok(pairs)
}

/// Embeds and stores catalog words that are not present yet.
pub struct WordIngestor {
    store: Arc<dyn GameStore>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl WordIngestor {
    pub fn new(store: Arc<dyn GameStore>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { store, embedder }
    }

    /// A failing row is logged and counted; the rest of the batch continues.
    pub async fn ingest(&self, pairs: &[WordPair]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for pair in pairs {
            if self
                .store
                .find_word_by_text(&pair.text_en, &pair.text_es)
                .await
                .context("Failed to look up existing word")?
                .is_some()
            {
                report.skipped += 1;
                continue;
            }

            match self.ingest_one(pair).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to ingest {}/{}", pair.text_es, pair.text_en);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn ingest_one(&self, pair: &WordPair) -> Result<()> {
        let embedding_en = self.embedder.embed(&normalize_text(&pair.text_en)).await?;
        let embedding_es = self.embedder.embed(&normalize_text(&pair.text_es)).await?;

        self.store
            .insert_word(&Word {
                id: Uuid::new_v4().to_string(),
                text_en: pair.text_en.clone(),
                text_es: pair.text_es.clone(),
                embedding_en: Some(embedding_en),
                embedding_es: Some(embedding_es),
                created_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}
