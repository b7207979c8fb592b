use serde::{Deserialize, Serialize};

pub mod attempt;
pub mod ban;
pub mod challenge;
pub mod game;
pub mod leaderboard;
pub mod player;
pub mod progress;
pub mod word;

/// Language a guess is played in. English is the primary language of every word,
/// Spanish the secondary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    /// Unknown locales fall back to English.
    pub fn from_locale(locale: Option<&str>) -> Self {
        match locale.map(|l| l.trim().to_ascii_lowercase()) {
            Some(l) if l == "es" || l.starts_with("es-") => Language::Es,
            _ => Language::En,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

// Serde converters for chrono::DateTime <-> mongodb::bson::DateTime, so range
// queries on timestamps compare dates instead of strings.
pub(crate) mod bson_datetime_as_chrono {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        bson::DateTime::from_millis(date.timestamp_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bson_dt = bson::DateTime::deserialize(deserializer)?;
        DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
            .ok_or_else(|| D::Error::custom("timestamp out of range"))
    }
}

pub(crate) mod bson_datetime_as_chrono_option {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_some(&bson::DateTime::from_millis(d.timestamp_millis())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        opt.map(|bson_dt| {
            DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
                .ok_or_else(|| D::Error::custom("timestamp out of range"))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parsing_defaults_to_english() {
        assert_eq!(Language::from_locale(Some("es")), Language::Es);
        assert_eq!(Language::from_locale(Some("ES-mx")), Language::Es);
        assert_eq!(Language::from_locale(Some("fr")), Language::En);
        assert_eq!(Language::from_locale(None), Language::En);
    }
}
