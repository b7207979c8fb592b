use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{request::Parts, Extensions, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// JSON body extractor whose rejections use the API's `{error, code}` envelope.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                let body = json!({
                    "error": message,
                    "code": "INVALID_BODY",
                });
                Err((StatusCode::BAD_REQUEST, Json(body)).into_response())
            }
        }
    }
}

/// Best-effort client address used for abuse accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip_from(&parts.headers, &parts.extensions)))
    }
}

/// Preferred order: X-Forwarded-For, Forwarded, X-Real-IP, then the socket peer.
pub fn client_ip_from(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return ip.to_string();
    }

    if let Some(forwarded) = headers.get("forwarded").and_then(|v| v.to_str().ok()) {
        let found = forwarded
            .split([';', ','])
            .map(str::trim)
            .find_map(|part| part.strip_prefix("for="))
            .map(|val| val.trim().trim_matches('"'));
        if let Some(ip) = found.filter(|s| !s.is_empty()) {
            return ip.to_string();
        }
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_x_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip_from(&headers, &Extensions::new()), "1.2.3.4");
    }

    #[test]
    fn test_client_ip_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert("forwarded", "for=5.6.7.8;proto=http".parse().unwrap());
        assert_eq!(client_ip_from(&headers, &Extensions::new()), "5.6.7.8");
    }

    #[test]
    fn test_client_ip_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "9.9.9.9".parse().unwrap());
        assert_eq!(client_ip_from(&headers, &Extensions::new()), "9.9.9.9");
    }

    #[test]
    fn test_client_ip_connect_info_fallback() {
        let mut exts = Extensions::new();
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        exts.insert(ConnectInfo(addr));
        assert_eq!(client_ip_from(&HeaderMap::new(), &exts), "127.0.0.1");
        assert_eq!(client_ip_from(&HeaderMap::new(), &Extensions::new()), "unknown");
    }
}
