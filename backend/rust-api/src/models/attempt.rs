use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, Language};

/// Append-only guess log. Rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub player_id: String,
    pub challenge_id: String,
    pub word_id: String,
    pub guess_text: String,
    pub similarity: f64,
    pub is_exact: bool,
    pub language: Language,
    pub source_address: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub attempted_at: DateTime<Utc>,
}
