use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, Language};

/// Bilingual target word. Embeddings are computed once at ingestion; a word is only
/// eligible for a challenge when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "_id")]
    pub id: String,
    pub text_en: String,
    pub text_es: String,
    #[serde(default)]
    pub embedding_en: Option<Vec<f32>>,
    #[serde(default)]
    pub embedding_es: Option<Vec<f32>>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl Word {
    pub fn text(&self, language: Language) -> &str {
        match language {
            Language::En => &self.text_en,
            Language::Es => &self.text_es,
        }
    }

    pub fn embedding(&self, language: Language) -> Option<&[f32]> {
        match language {
            Language::En => self.embedding_en.as_deref(),
            Language::Es => self.embedding_es.as_deref(),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.embedding_en.is_some() && self.embedding_es.is_some()
    }
}

/// Field holding the embedding for a language, for projections and filters.
pub fn embedding_field(language: Language) -> &'static str {
    match language {
        Language::En => "embedding_en",
        Language::Es => "embedding_es",
    }
}
