#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use wordpulse_api::{
    config::{Config, StorageBackend},
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::word::Word,
    services::{
        embedding_client::{EmbeddingClient, EmbeddingError},
        text_generator::{GenerationError, GenerationRequest, TextGenerator},
        text_policy::TextPolicy,
        AppState,
    },
    store::{GameStore, MemoryStore},
};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const WORD_ID: &str = "word-dog";
pub const HINT_TEXT: &str = "Loyal companion that barks at the mailman";

/// Maps a handful of known words onto fixed unit vectors; everything else is orthogonal
/// to the target.
pub struct FixedEmbedder;

#[async_trait]
impl EmbeddingClient for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match text {
            "dog" | "perro" => Ok(vec![1.0, 0.0, 0.0]),
            "puppy" | "cachorro" => Ok(vec![0.8, 0.6, 0.0]),
            "boom" => Err(EmbeddingError::Empty),
            _ => Ok(vec![0.0, 0.0, 1.0]),
        }
    }
}

/// Embedding service that is always down.
pub struct OfflineEmbedder;

#[async_trait]
impl EmbeddingClient for OfflineEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::NotConfigured("offline"))
    }
}

/// Answers category prompts with JSON and hint prompts with a fixed sentence.
pub struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if request.json {
            Ok(r#"{"category_en":"animal","category_es":"animal"}"#.to_string())
        } else {
            Ok(HINT_TEXT.to_string())
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

pub fn target_word() -> Word {
    Word {
        id: WORD_ID.to_string(),
        text_en: "dog".to_string(),
        text_es: "perro".to_string(),
        embedding_en: Some(vec![1.0, 0.0, 0.0]),
        embedding_es: Some(vec![1.0, 0.0, 0.0]),
        created_at: Utc::now(),
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(FixedEmbedder))
}

pub fn create_test_app_with(embedder: Arc<dyn EmbeddingClient>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        storage_backend: StorageBackend::Memory,
        admin_api_key: Some(ADMIN_KEY.to_string()),
        jwt_secret: "integration-test-secret".to_string(),
        ..Config::default()
    };

    let word = target_word();
    let policy = TextPolicy::new([word.text_en.as_str(), word.text_es.as_str()]);
    let store = Arc::new(MemoryStore::with_words(vec![word]));
    let game_store: Arc<dyn GameStore> = store.clone();

    let app_state = Arc::new(AppState::from_parts(
        config.clone(),
        game_store,
        None,
        embedder,
        Arc::new(CannedGenerator),
        Arc::new(policy),
    ));

    TestApp {
        router: create_router(app_state),
        store,
        config,
    }
}

impl TestApp {
    pub fn bearer_for(&self, sub: &str, name: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: sub.to_string(),
            name: Some(name.to_string()),
            exp: (now + 3600) as usize,
            iat: now as usize,
        };
        let token = JwtService::new(&self.config.jwt_secret)
            .generate_token(&claims)
            .unwrap();
        format!("Bearer {}", token)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: Value, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Submits a guess as an anonymous player.
    pub async fn guess(&self, device: &str, nickname: &str, guess: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/guess",
            serde_json::json!({
                "guess": guess,
                "locale": "en",
                "device_token": device,
                "nickname": nickname,
            }),
            &[],
        )
        .await
    }
}
