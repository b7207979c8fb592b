use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_ms: u64,
    pub max_retries: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-large".to_string(),
            dimension: 3072,
            timeout_ms: 10_000,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbuseSettings {
    pub enabled: bool,
    /// Attempts allowed per source address in a trailing 24h window.
    pub max_daily_attempts: u64,
    pub ban_hours: i64,
    /// Per-minute burst limit enforced through Redis, when configured.
    pub burst_per_minute: u32,
}

impl Default for AbuseSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_daily_attempts: 200,
            ban_hours: 24,
            burst_per_minute: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub storage_backend: StorageBackend,
    pub redis_uri: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub admin_api_key: Option<String>,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub abuse: AbuseSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "wordpulse".to_string(),
            storage_backend: StorageBackend::Mongo,
            redis_uri: None,
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            admin_api_key: None,
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            abuse: AbuseSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml, then APP__* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let defaults = Config::default();

        let string = |key: &str, fallback_env: Option<&str>| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| fallback_env.and_then(|name| env::var(name).ok()))
                .filter(|v| !v.trim().is_empty())
        };
        let int = |key: &str| settings.get_int(key).ok();

        let storage_backend = match string("storage_backend", Some("STORAGE_BACKEND")).as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("mongo") | None => StorageBackend::Mongo,
            Some(other) => {
                return Err(config::ConfigError::Message(format!(
                    "unknown storage_backend '{}'",
                    other
                )))
            }
        };

        let jwt_secret = match string("jwt_secret", Some("JWT_SECRET")) {
            Some(secret) => secret,
            None if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            None => {
                tracing::warn!("Using default JWT secret (dev mode only)");
                defaults.jwt_secret.clone()
            }
        };

        let openai_key = env::var("OPENAI_API_KEY").ok();

        let embedding = EmbeddingSettings {
            api_url: string("embedding.api_url", None).unwrap_or(defaults.embedding.api_url),
            api_key: string("embedding.api_key", None).or_else(|| openai_key.clone()),
            model: string("embedding.model", None).unwrap_or(defaults.embedding.model),
            dimension: int("embedding.dimension")
                .map(|v| v as usize)
                .unwrap_or(defaults.embedding.dimension),
            timeout_ms: int("embedding.timeout_ms")
                .map(|v| v as u64)
                .unwrap_or(defaults.embedding.timeout_ms),
            max_retries: int("embedding.max_retries")
                .map(|v| v as usize)
                .unwrap_or(defaults.embedding.max_retries),
        };

        let generation = GenerationSettings {
            api_url: string("generation.api_url", None).unwrap_or(defaults.generation.api_url),
            api_key: string("generation.api_key", None).or(openai_key),
            model: string("generation.model", None).unwrap_or(defaults.generation.model),
            timeout_ms: int("generation.timeout_ms")
                .map(|v| v as u64)
                .unwrap_or(defaults.generation.timeout_ms),
        };

        let abuse = AbuseSettings {
            enabled: settings
                .get_bool("abuse.enabled")
                .unwrap_or(defaults.abuse.enabled),
            max_daily_attempts: int("abuse.max_daily_attempts")
                .map(|v| v as u64)
                .unwrap_or(defaults.abuse.max_daily_attempts),
            ban_hours: int("abuse.ban_hours").unwrap_or(defaults.abuse.ban_hours),
            burst_per_minute: int("abuse.burst_per_minute")
                .map(|v| v as u32)
                .unwrap_or(defaults.abuse.burst_per_minute),
        };

        Ok(Config {
            mongo_uri: string("mongo_uri", Some("MONGO_URI")).unwrap_or(defaults.mongo_uri),
            mongo_database: string("mongo_database", Some("MONGO_DATABASE"))
                .unwrap_or(defaults.mongo_database),
            storage_backend,
            redis_uri: string("redis_uri", Some("REDIS_URI")),
            jwt_secret,
            bind_addr: string("bind_addr", Some("BIND_ADDR")).unwrap_or(defaults.bind_addr),
            admin_api_key: string("admin_api_key", Some("ADMIN_API_KEY")),
            embedding,
            generation,
            abuse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_are_applied() {
        env::set_var("APP__STORAGE_BACKEND", "memory");
        env::set_var("APP__ABUSE__MAX_DAILY_ATTEMPTS", "50");
        env::set_var("ADMIN_API_KEY", "sweep-key");

        let config = Config::load().unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.abuse.max_daily_attempts, 50);
        assert_eq!(config.admin_api_key.as_deref(), Some("sweep-key"));

        env::remove_var("APP__STORAGE_BACKEND");
        env::remove_var("APP__ABUSE__MAX_DAILY_ATTEMPTS");
        env::remove_var("ADMIN_API_KEY");
    }

    #[test]
    #[serial]
    fn defaults_match_game_rules() {
        let config = Config::default();
        assert_eq!(config.abuse.max_daily_attempts, 200);
        assert_eq!(config.abuse.ban_hours, 24);
        assert_eq!(config.storage_backend, StorageBackend::Mongo);
    }
}
