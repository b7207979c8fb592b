use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::middlewares::auth::JwtClaims;
use crate::models::player::Player;
use crate::services::text_policy::TextPolicy;
use crate::store::GameStore;
use crate::utils::text::nickname_key;

pub const DEVICE_TOKEN_MIN_CHARS: usize = 8;
pub const DEVICE_TOKEN_MAX_CHARS: usize = 128;

const NICKNAME_TAKEN: &str = "This nickname is already taken. Please choose another one.";

/// Who is making the request, as far as the transport could tell.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRequest<'a> {
    pub claims: Option<&'a JwtClaims>,
    pub device_token: Option<&'a str>,
    pub nickname: Option<&'a str>,
}

/// Maps requests to players: registered accounts by token subject, anonymous players by
/// device token plus a unique nickname.
pub struct IdentityService {
    store: Arc<dyn GameStore>,
    policy: Arc<TextPolicy>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn GameStore>, policy: Arc<TextPolicy>) -> Self {
        Self { store, policy }
    }

    /// Resolves the caller, creating the player row on first contact.
    pub async fn resolve_or_create(&self, request: IdentityRequest<'_>) -> GameResult<Player> {
        if let Some(claims) = request.claims {
            return self.registered_player(claims).await;
        }

        let device_token = validate_device_token(request.device_token)?;
        if let Some(existing) = self.store.find_player_by_device(device_token).await? {
            return Ok(existing);
        }

        let nickname = request
            .nickname
            .ok_or_else(|| GameError::validation("A nickname is required to play anonymously"))?;
        let nickname = self.policy.validate_nickname(nickname)?;
        let key = nickname_key(&nickname);
        if self.store.find_anonymous_by_nickname_key(&key).await?.is_some() {
            return Err(GameError::validation(NICKNAME_TAKEN));
        }

        let player = Player::anonymous(device_token, &nickname, key);
        match self.store.insert_player(&player).await {
            Ok(()) => {
                tracing::info!(
                    "Anonymous player created: id={}, nickname={}",
                    player.id,
                    nickname
                );
                Ok(player)
            }
            Err(e) if e.is_duplicate_key() => {
                // Same device raced us, or someone claimed the nickname in between.
                match self.store.find_player_by_device(device_token).await? {
                    Some(existing) => Ok(existing),
                    None => Err(GameError::validation(NICKNAME_TAKEN)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves the caller without creating anything.
    pub async fn resolve_existing(&self, request: IdentityRequest<'_>) -> GameResult<Option<Player>> {
        if let Some(claims) = request.claims {
            return Ok(self
                .store
                .get_player(&Player::registered(&claims.sub, None).id)
                .await?
                .or_else(|| Some(Player::registered(&claims.sub, claims.name.clone()))));
        }
        match request.device_token {
            Some(token) => {
                let token = validate_device_token(Some(token))?;
                Ok(self.store.find_player_by_device(token).await?)
            }
            None => Ok(None),
        }
    }

    /// Checks a nickname before it is claimed. The device's own nickname is not a conflict.
    pub async fn check_nickname(&self, nickname: &str, device_token: Option<&str>) -> GameResult<()> {
        let nickname = self.policy.validate_nickname(nickname)?;
        let key = nickname_key(&nickname);
        if let Some(owner) = self.store.find_anonymous_by_nickname_key(&key).await? {
            if owner.device_token.as_deref() != device_token || device_token.is_none() {
                return Err(GameError::validation(NICKNAME_TAKEN));
            }
        }
        Ok(())
    }

    async fn registered_player(&self, claims: &JwtClaims) -> GameResult<Player> {
        let player = Player::registered(&claims.sub, claims.name.clone());
        if let Some(existing) = self.store.get_player(&player.id).await? {
            return Ok(existing);
        }
        match self.store.insert_player(&player).await {
            Ok(()) => {
                tracing::info!("Registered player created: id={}", player.id);
                Ok(player)
            }
            Err(e) if e.is_duplicate_key() => self
                .store
                .get_player(&player.id)
                .await?
                .ok_or_else(|| GameError::Internal(anyhow::anyhow!("player {} vanished", player.id))),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_device_token(token: Option<&str>) -> GameResult<&str> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GameError::validation("A device token is required to play anonymously"))?;
    let len = token.chars().count();
    if !(DEVICE_TOKEN_MIN_CHARS..=DEVICE_TOKEN_MAX_CHARS).contains(&len) {
        return Err(GameError::validation(format!(
            "Device token must be between {} and {} characters",
            DEVICE_TOKEN_MIN_CHARS, DEVICE_TOKEN_MAX_CHARS
        )));
    }
    Ok(token)
}
