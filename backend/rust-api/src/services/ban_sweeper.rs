use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{metrics::BAN_SWEEPER_TICKS_TOTAL, services::abuse_guard::AbuseGuard};

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Periodically deletes expired ban records.
pub struct BanSweeper {
    guard: AbuseGuard,
    interval: Duration,
}

impl BanSweeper {
    pub fn new(guard: AbuseGuard, interval: Duration) -> Self {
        Self { guard, interval }
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting ban sweeper loop (interval {}s)",
            self.interval.as_secs()
        );

        loop {
            match self.run_once().await {
                Ok(removed) => {
                    BAN_SWEEPER_TICKS_TOTAL.with_label_values(&["success"]).inc();
                    info!("Ban sweeper tick completed, removed {}", removed);
                }
                Err(err) => {
                    BAN_SWEEPER_TICKS_TOTAL.with_label_values(&["error"]).inc();
                    warn!(error = %err, "Ban sweeper tick failed");
                }
            }

            sleep(self.interval).await;
        }
    }

    pub async fn run_once(&self) -> Result<u64> {
        Ok(self.guard.sweep_expired_bans(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbuseSettings;
    use crate::models::ban::BanRecord;
    use crate::store::{GameStore, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn run_once_clears_expired_bans() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .upsert_ban(&BanRecord {
                address: "192.0.2.1".into(),
                reason: "test".into(),
                banned_at: now - chrono::Duration::hours(25),
                expires_at: now - chrono::Duration::hours(1),
            })
            .await
            .unwrap();

        let sweeper = BanSweeper::new(
            AbuseGuard::new(store.clone(), AbuseSettings::default()),
            Duration::from_secs(1),
        );
        assert_eq!(sweeper.run_once().await.unwrap(), 1);
        assert!(store.get_ban("192.0.2.1").await.unwrap().is_none());
    }
}
