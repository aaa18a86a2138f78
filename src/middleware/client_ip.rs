use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Bucket shared by every request whose origin cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolves the identity a request is counted against.
///
/// The first entry of `X-Forwarded-For` wins whenever it is present, so a
/// client talking to the service directly can pick its own key. Only deploy
/// behind a proxy that overwrites the header.
///
/// The first entry is trimmed. When it is blank (`X-Forwarded-For: , 10.0.0.1`)
/// the later entries are not consulted and the peer address is used instead,
/// rather than keying the request on an empty string.
pub fn resolve_client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
