//! Custom axum extractors for the proxy handler.

use crate::error::ApiError;
use crate::middleware::{CorrelationIdExt, CORRELATION_ID_HEADER};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::net::SocketAddr;
use uuid::Uuid;

/// The correlation id resolved by the middleware (or minted here when the
/// handler runs without it, as in unit tests).
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ext) = parts.extensions.get::<CorrelationIdExt>() {
            return Ok(Self(ext.0.clone()));
        }

        let id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), String::from);

        Ok(Self(id))
    }
}

/// Client address used as the anonymous rate-limit identity.
///
/// Forwarding headers win over the socket peer so a gateway behind a load
/// balancer still sees the real client.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                parts
                    .headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            })
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        Ok(Self(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let mut p = parts(Request::builder().uri("/"));
        p.extensions.insert(CorrelationIdExt("from-middleware".into()));

        let CorrelationId(id) = CorrelationId::from_request_parts(&mut p, &())
            .await
            .unwrap();
        assert_eq!(id, "from-middleware");
    }

    #[tokio::test]
    async fn test_correlation_id_falls_back_to_header_then_fresh() {
        let mut p = parts(Request::builder().uri("/").header(CORRELATION_ID_HEADER, "h-1"));
        let CorrelationId(id) = CorrelationId::from_request_parts(&mut p, &())
            .await
            .unwrap();
        assert_eq!(id, "h-1");

        let mut p = parts(Request::builder().uri("/"));
        let CorrelationId(id) = CorrelationId::from_request_parts(&mut p, &())
            .await
            .unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn test_client_ip_from_forwarded_for() {
        let mut p = parts(
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
        );
        let ClientIp(ip) = ClientIp::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_client_ip_from_connect_info() {
        let mut p = parts(Request::builder().uri("/"));
        p.extensions
            .insert(ConnectInfo("198.51.100.7:4242".parse::<SocketAddr>().unwrap()));

        let ClientIp(ip) = ClientIp::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("198.51.100.7"));
    }

    #[tokio::test]
    async fn test_client_ip_unavailable() {
        let mut p = parts(Request::builder().uri("/"));
        let ClientIp(ip) = ClientIp::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(ip, None);
    }
}
