use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_datetime_as_chrono;

/// Temporary ban keyed by source address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    #[serde(rename = "_id")]
    pub address: String,
    pub reason: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub banned_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub expires_at: DateTime<Utc>,
}

impl BanRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
