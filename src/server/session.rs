//! Anonymous session key
//!
//! A random UUID kept in the `session_id` cookie to group the stories and
//! jobs created from one browser. It is not a credential: it authenticates
//! nobody and gates no request.

use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

/// Returns the session id carried by the request, if it is a well-formed UUID.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim().trim_matches('"')).ok())
        .map(|id| id.to_string())
}

/// Existing session id, or a fresh one for first contact.
pub fn session_or_new(headers: &HeaderMap) -> (String, bool) {
    match session_from_headers(headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

pub fn session_cookie(session_id: &str) -> HeaderValue {
    // A UUID only contains header-safe characters.
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax",
        SESSION_COOKIE, session_id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("session_id=; HttpOnly; Path=/"))
}
