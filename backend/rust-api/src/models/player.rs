use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_datetime_as_chrono;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Registered,
    Anonymous,
}

/// Player stored in the "players" collection. Registered accounts and anonymous
/// devices share one id space so both can own progress rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: PlayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Normalized nickname, unique among anonymous players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname_key: Option<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn registered(account_id: &str, display_name: Option<String>) -> Self {
        Self {
            id: format!("acct_{}", account_id),
            kind: PlayerKind::Registered,
            display_name,
            device_token: None,
            nickname: None,
            nickname_key: None,
            created_at: Utc::now(),
        }
    }

    pub fn anonymous(device_token: &str, nickname: &str, nickname_key: String) -> Self {
        Self {
            id: format!("anon_{}", uuid::Uuid::new_v4().simple()),
            kind: PlayerKind::Anonymous,
            display_name: None,
            device_token: Some(device_token.to_string()),
            nickname: Some(nickname.to_string()),
            nickname_key: Some(nickname_key),
            created_at: Utc::now(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == PlayerKind::Anonymous
    }

    /// Key used to merge rows that belong to the same human on leaderboards.
    pub fn canonical_key(&self) -> String {
        match (&self.kind, &self.device_token) {
            (PlayerKind::Anonymous, Some(token)) => format!("anon:{}", token),
            _ => format!("user:{}", self.id),
        }
    }

    pub fn public_name(&self) -> String {
        match self.kind {
            PlayerKind::Anonymous => self.nickname.clone(),
            PlayerKind::Registered => self.display_name.clone(),
        }
        .unwrap_or_else(|| "Player".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keys_distinguish_player_kinds() {
        let registered = Player::registered("42", Some("Ana".into()));
        assert_eq!(registered.canonical_key(), "user:acct_42");

        let anon = Player::anonymous("device-abcdef", "Lobo", "lobo".into());
        assert_eq!(anon.canonical_key(), "anon:device-abcdef");
        assert_eq!(anon.public_name(), "Lobo");
    }
}
