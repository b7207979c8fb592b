use anyhow::{bail, Context};
use tracing_subscriber::fmt::init;

use wordpulse_api::{
    config::Config,
    services::{
        word_ingest::{parse_word_csv, WordIngestor},
        AppState,
    },
};

/// Usage: `ingest_words <path/to/words.csv>` with `spanish,english` rows.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: ingest_words <words.csv>");
    };

    let input = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let pairs = parse_word_csv(&input)?;
    tracing::info!("Parsed {} word pairs from {}", pairs.len(), path);

    let config = Config::load().context("Failed to load configuration")?;
    if config.embedding.api_key.is_none() {
        bail!("An embedding API key is required to ingest words");
    }

    let app_state = AppState::new(config)
        .await
        .context("Failed to initialize app state")?;

    let ingestor = WordIngestor::new(app_state.store.clone(), app_state.embedder.clone());
    let report = ingestor.ingest(&pairs).await?;

    tracing::info!(
        "Ingestion finished: {} inserted, {} already present, {} failed",
        report.inserted,
        report.skipped,
        report.failed
    );

    Ok(())
}
