use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::fmt::init;

use wordpulse_api::{
    config::Config,
    services::{
        abuse_guard::AbuseGuard,
        ban_sweeper::{BanSweeper, DEFAULT_SWEEP_INTERVAL_SECS},
        AppState,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::load().context("Failed to load configuration")?;

    let interval_secs = std::env::var("BAN_SWEEPER_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

    let app_state = AppState::new(config)
        .await
        .context("Failed to initialize app state")?;

    let guard = AbuseGuard::new(app_state.store.clone(), app_state.config.abuse.clone());
    let sweeper = BanSweeper::new(guard, Duration::from_secs(interval_secs));

    sweeper.run().await?;

    Ok(())
}
