use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::AbuseSettings;
use crate::error::{GameError, GameResult};
use crate::metrics::{ABUSE_REJECTIONS_TOTAL, BANS_CREATED_TOTAL};
use crate::models::ban::BanRecord;
use crate::store::GameStore;

const DAILY_LIMIT_REASON: &str = "daily attempt limit exceeded";

/// Per-address attempt limiting and temporary bans. Runs before any state is mutated.
pub struct AbuseGuard {
    store: Arc<dyn GameStore>,
    settings: AbuseSettings,
}

impl AbuseGuard {
    pub fn new(store: Arc<dyn GameStore>, settings: AbuseSettings) -> Self {
        Self { store, settings }
    }

    pub async fn check_and_record(&self, address: &str) -> GameResult<()> {
        self.check_and_record_at(address, Utc::now()).await
    }

    pub async fn check_and_record_at(&self, address: &str, now: DateTime<Utc>) -> GameResult<()> {
        if !self.settings.enabled {
            return Ok(());
        }

        if let Some(ban) = self.store.get_ban(address).await? {
            if ban.is_active(now) {
                ABUSE_REJECTIONS_TOTAL.with_label_values(&["banned"]).inc();
                return Err(GameError::Abuse(format!(
                    "address {} banned until {}",
                    address, ban.expires_at
                )));
            }
        }

        let since = now - Duration::hours(24);
        let recent = self
            .store
            .count_attempts_from_address_since(address, since)
            .await?;

        if recent >= self.settings.max_daily_attempts {
            let ban = BanRecord {
                address: address.to_string(),
                reason: DAILY_LIMIT_REASON.to_string(),
                banned_at: now,
                expires_at: now + Duration::hours(self.settings.ban_hours),
            };
            self.store.upsert_ban(&ban).await?;
            BANS_CREATED_TOTAL.inc();
            ABUSE_REJECTIONS_TOTAL
                .with_label_values(&["daily_limit"])
                .inc();
            tracing::warn!(
                "Address {} banned until {} after {} attempts in 24h",
                address,
                ban.expires_at,
                recent
            );
            return Err(GameError::Abuse(DAILY_LIMIT_REASON.to_string()));
        }

        Ok(())
    }

    /// Deletes ban records that are no longer active. Housekeeping only; checks never
    /// trust a stale row.
    pub async fn sweep_expired_bans(&self, now: DateTime<Utc>) -> GameResult<u64> {
        let removed = self.store.delete_expired_bans(now).await?;
        if removed > 0 {
            tracing::info!("Removed {} expired ban records", removed);
        }
        Ok(removed)
    }
}
