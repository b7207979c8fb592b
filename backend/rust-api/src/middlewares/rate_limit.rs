use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde_json::json;
use std::sync::Arc;

use crate::extractors::client_ip_from;
use crate::metrics::{record_cache_operation, ABUSE_REJECTIONS_TOTAL};
use crate::services::AppState;

const BURST_WINDOW_SECONDS: u64 = 60;

/// Fixed-window counter; the key expires with the window.
const BURST_SCRIPT: &str = r#"
    local key = KEYS[1]
    local limit = tonumber(ARGV[1])
    local window = tonumber(ARGV[2])

    local current = redis.call('GET', key)

    if current == false then
        redis.call('SET', key, 1, 'EX', window)
        return 1
    end

    current = tonumber(current)

    if current >= limit then
        return 0
    end

    redis.call('INCR', key)
    return 1
"#;

/// Per-address burst limiter in front of gameplay routes. This sits ahead of the daily
/// abuse guard and only runs when Redis is configured. Redis failures let the request
/// through; the daily guard still applies.
pub async fn burst_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(request).await;
    };
    if !state.config.abuse.enabled || state.config.abuse.burst_per_minute == 0 {
        return next.run(request).await;
    }

    let client_ip = client_ip_from(request.headers(), request.extensions());
    let key = burst_key(&client_ip);

    let verdict = check_burst(redis, &key, state.config.abuse.burst_per_minute).await;
    record_cache_operation("burst_check", verdict.is_ok());

    match verdict {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::warn!("Burst limit exceeded for IP: {}", client_ip);
            ABUSE_REJECTIONS_TOTAL.with_label_values(&["burst"]).inc();
            too_many_requests()
        }
        Err(e) => {
            tracing::error!("Burst limit check failed: {}", e);
            next.run(request).await
        }
    }
}

fn burst_key(client_ip: &str) -> String {
    format!("wordpulse:burst:{}", client_ip)
}

fn too_many_requests() -> Response {
    let body = json!({
        "error": "Too many requests. Slow down and try again shortly.",
        "code": "RATE_LIMITED",
    });
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response.headers_mut().insert(
        axum::http::header::RETRY_AFTER,
        axum::http::HeaderValue::from(BURST_WINDOW_SECONDS),
    );
    response
}

async fn check_burst(redis: &ConnectionManager, key: &str, limit: u32) -> anyhow::Result<bool> {
    let mut conn = redis.clone();

    let allowed: u32 = redis::Script::new(BURST_SCRIPT)
        .key(key)
        .arg(limit)
        .arg(BURST_WINDOW_SECONDS)
        .invoke_async(&mut conn)
        .await?;

    Ok(allowed == 1)
}
