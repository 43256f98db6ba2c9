//! Resolve the authenticated user for an upgrade request.
//!
//! Authentication happens upstream. The proxy forwards the verified user id
//! in a trusted header; the `user` query parameter is accepted as a fallback
//! for clients that cannot set headers on a WebSocket handshake.

use axum::http::HeaderMap;
use herald_core::UserId;
use serde::Deserialize;

/// Query string of `GET /ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Fallback user id.
    pub user: Option<String>,
}

/// User id from `header`, else from the query. Blank values count as absent.
pub fn identify(headers: &HeaderMap, header: &str, query: &WsQuery) -> Option<UserId> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(non_blank)
        .or_else(|| query.user.as_deref().and_then(non_blank))
        .map(UserId::from)
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
