//! Upstream request construction and response relay.
//!
//! Header policy for a forwarded request:
//! - hop-by-hop headers are scoped to one connection and never cross the
//!   proxy (RFC 9110 §7.6.1, plus `Host`, which names the wrong server)
//! - `X-Api-Key` is the gateway's credential and stays here
//! - the inbound `X-Correlation-Id` is replaced by the gateway-owned one
//! - `Content-Length` is dropped in both directions: bodies are re-framed
//!   by the HTTP client around the forwarded stream

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use breakwater_resilience::BulkheadPermit;
use futures_util::StreamExt;

/// Gateway credential header, stripped before forwarding.
pub const API_KEY_HEADER: &str = "x-api-key";

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "host"
    )
}

/// Build the upstream URI: base + forward path + original query string.
#[must_use]
pub fn upstream_uri(base: &str, forward_path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{base}{forward_path}?{q}"),
        _ => format!("{base}{forward_path}"),
    }
}

/// Headers for the upstream request: everything the client sent minus
/// hop-by-hop, credential, correlation, and framing headers, with the
/// gateway's correlation id injected.
#[must_use]
pub fn request_headers(inbound: &HeaderMap, correlation_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || name.as_str() == API_KEY_HEADER
            || name.as_str() == CORRELATION_ID_HEADER
            || *name == header::CONTENT_LENGTH
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
    headers
}

/// Relay an upstream response: copy the status, copy headers minus
/// hop-by-hop and framing, and stream the body through without buffering.
///
/// The bulkhead slot rides inside the body stream: the upstream transfer
/// is still in flight while the body copies, so the slot is released only
/// when the stream completes or the client goes away.
#[must_use]
pub fn relay_response(upstream: reqwest::Response, permit: BulkheadPermit) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        if is_hop_by_hop(name) || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let body = upstream.bytes_stream().map(move |chunk| {
        let _slot_held = &permit;
        chunk
    });

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
