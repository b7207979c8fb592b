use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Storage-level failures. `DuplicateKey` is how unique-constraint races surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

/// Why a request was refused without touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionDenied {
    #[error("challenge already solved")]
    AlreadySolved,
    #[error("no attempts remaining")]
    NoAttemptsRemaining,
    #[error("bonus attempt already used")]
    BonusAlreadyUsed,
    #[error("bonus attempt not available")]
    BonusNotEligible,
    #[error("hint unlocks after {remaining} more attempts")]
    HintLocked { remaining: u32 },
    #[error("hints are not available after solving")]
    HintAfterSolve,
}

impl PermissionDenied {
    pub fn code(&self) -> &'static str {
        match self {
            PermissionDenied::AlreadySolved => "ALREADY_SOLVED",
            PermissionDenied::NoAttemptsRemaining => "NO_ATTEMPTS_REMAINING",
            PermissionDenied::BonusAlreadyUsed => "BONUS_ALREADY_USED",
            PermissionDenied::BonusNotEligible => "BONUS_NOT_ELIGIBLE",
            PermissionDenied::HintLocked { .. } => "HINT_LOCKED",
            PermissionDenied::HintAfterSolve => "HINT_AFTER_SOLVE",
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Permission(#[from] PermissionDenied),
    #[error("request rejected: {0}")]
    Abuse(String),
    #[error("dependency unavailable: {0}")]
    Dependency(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GameError {
    pub fn validation(message: impl Into<String>) -> Self {
        GameError::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "VALIDATION_ERROR",
            GameError::Permission(p) => p.code(),
            GameError::Abuse(_) => "ABUSE_REJECTED",
            GameError::Dependency(_) => "DEPENDENCY_UNAVAILABLE",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::Store(_) | GameError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::Permission(_) => StatusCode::FORBIDDEN,
            GameError::Abuse(_) => StatusCode::TOO_MANY_REQUESTS,
            GameError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Store(_) | GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for GameError {
    fn from(errors: validator::ValidationErrors) -> Self {
        GameError::Validation(errors.to_string())
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            GameError::Store(err) => {
                tracing::error!(error = %err, "Store failure");
                json!({ "error": "Internal server error", "code": code })
            }
            GameError::Internal(err) => {
                tracing::error!(error = %err, "Internal failure");
                json!({ "error": "Internal server error", "code": code })
            }
            // Callers get a generic message; the reason stays in the logs.
            GameError::Abuse(reason) => {
                tracing::warn!(reason = %reason, "Request rejected by abuse guard");
                json!({ "error": "Too many requests", "code": code, "banned": true })
            }
            GameError::Dependency(reason) => {
                tracing::warn!(reason = %reason, "Dependency failure");
                json!({ "error": "Scoring service temporarily unavailable, please retry", "code": code })
            }
            other => json!({ "error": other.to_string(), "code": code }),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, GameError::Dependency(_)) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("5"));
        }
        response
    }
}

pub type GameResult<T> = Result<T, GameError>;
