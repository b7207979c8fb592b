use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, Language};

/// The single challenge of a UTC calendar day. `date` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "_id")]
    pub id: String,
    pub word_id: String,
    pub date: NaiveDate,
    pub category_en: String,
    pub category_es: String,
    #[serde(default)]
    pub hint_en: Option<String>,
    #[serde(default)]
    pub hint_es: Option<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn category(&self, language: Language) -> &str {
        match language {
            Language::En => &self.category_en,
            Language::Es => &self.category_es,
        }
    }

    pub fn hint(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.hint_en.as_deref(),
            Language::Es => self.hint_es.as_deref(),
        }
    }
}

pub fn hint_field(language: Language) -> &'static str {
    match language {
        Language::En => "hint_en",
        Language::Es => "hint_es",
    }
}
