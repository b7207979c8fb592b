use std::sync::Arc;

use anyhow::Context;
use redis::aio::ConnectionManager;

use crate::config::{Config, StorageBackend};
use crate::store::{GameStore, MemoryStore, MongoStore};
use embedding_client::{EmbeddingClient, OpenAiEmbeddingClient};
use text_generator::{OpenAiTextGenerator, TextGenerator};
use text_policy::TextPolicy;

pub mod abuse_guard;
pub mod ban_sweeper;
pub mod bonus_policy;
pub mod challenge_service;
pub mod embedding_client;
pub mod game_service;
pub mod hint_service;
pub mod identity_service;
pub mod leaderboard_service;
pub mod progress_service;
pub mod scoring;
pub mod similarity_service;
pub mod text_generator;
pub mod text_policy;
pub mod word_ingest;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn GameStore>,
    pub redis: Option<ConnectionManager>,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub generator: Arc<dyn TextGenerator>,
    pub text_policy: Arc<TextPolicy>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn GameStore> = match config.storage_backend {
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let store = MongoStore::new(client.database(&config.mongo_database));
                store.ensure_indexes().await?;
                tracing::info!("MongoDB connected");
                Arc::new(store)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; state is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let redis = match config.redis_uri.as_deref() {
            Some(uri) => Some(connect_redis(uri).await?),
            None => {
                tracing::info!("Redis not configured, burst limiting disabled");
                None
            }
        };

        let embedder = OpenAiEmbeddingClient::new(config.embedding.clone())
            .context("Failed to build embedding HTTP client")?;
        if !embedder.is_available() {
            tracing::warn!("Embedding API key not configured; guesses cannot be scored");
        }
        let generator = OpenAiTextGenerator::new(config.generation.clone())
            .context("Failed to build generation HTTP client")?;

        // Every target word is whitelisted so correct guesses are never flagged.
        let words = store.all_word_texts().await?;
        let text_policy = TextPolicy::new(&words);
        tracing::info!("Loaded {} words into the profanity whitelist", text_policy.whitelist_len());

        Ok(Self::from_parts(
            config,
            store,
            redis,
            Arc::new(embedder),
            Arc::new(generator),
            Arc::new(text_policy),
        ))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn GameStore>,
        redis: Option<ConnectionManager>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn TextGenerator>,
        text_policy: Arc<TextPolicy>,
    ) -> Self {
        Self {
            config,
            store,
            redis,
            embedder,
            generator,
            text_policy,
        }
    }
}

async fn connect_redis(uri: &str) -> anyhow::Result<ConnectionManager> {
    tracing::info!("Attempting to connect to Redis...");
    let client = redis::Client::open(uri)?;

    let redis = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        ConnectionManager::new(client),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    let mut conn = redis.clone();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}
