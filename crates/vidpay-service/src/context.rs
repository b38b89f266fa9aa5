//! Per-request client context.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use vidpay_store::ClientInfo;

use crate::error::ApiError;

/// Longest accepted `Idempotency-Key`.
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Client details and the optional idempotency key of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP and user agent.
    pub client: ClientInfo,
    /// Value of the `Idempotency-Key` header.
    pub idempotency_key: Option<String>,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let idempotency_key = header(headers, "idempotency-key");
        if idempotency_key
            .as_ref()
            .is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LEN)
        {
            return Err(ApiError::BadRequest(format!(
                "Idempotency-Key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }

        Ok(Self {
            client: ClientInfo {
                ip_address: client_ip(headers),
                user_agent: header(headers, "user-agent"),
            },
            idempotency_key,
        })
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header(headers, "x-real-ip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(request: axum::http::Request<()>) -> Result<RequestContext, ApiError> {
        let (mut parts, ()) = request.into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn prefers_first_forwarded_hop() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .header("user-agent", "test-agent")
            .header("idempotency-key", "  key-1 ")
            .body(())
            .unwrap();

        let context = extract(request).await.unwrap();
        assert_eq!(context.client.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(context.client.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(context.idempotency_key.as_deref(), Some("key-1"));
    }

    #[tokio::test]
    async fn rejects_oversized_idempotency_key() {
        let request = axum::http::Request::builder()
            .header("idempotency-key", "k".repeat(256))
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::BadRequest(_))));
    }
}
