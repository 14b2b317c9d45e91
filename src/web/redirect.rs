//! Redirects that work for both full page loads and htmx requests

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use url::Url;

/// Request header set by htmx on in-page requests
pub const HX_REQUEST: &str = "HX-Request";
/// Response header telling htmx to navigate
pub const HX_REDIRECT: &str = "HX-Redirect";

/// Redirect to `to`
///
/// htmx requests get `200` with `HX-Redirect`, everything else a
/// `303 See Other`.
pub fn hx_redirect(headers: &HeaderMap, to: &str) -> Response {
    let Ok(location) = HeaderValue::from_str(to) else {
        tracing::warn!(to, "Refusing redirect to invalid header value");
        return StatusCode::BAD_REQUEST.into_response();
    };

    if headers.contains_key(HX_REQUEST) {
        (StatusCode::OK, [(HX_REDIRECT, location)]).into_response()
    } else {
        (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
    }
}

/// Return target from a login form or query
///
/// Only local paths are honoured; anything else falls back to `default`.
pub fn safe_return_target<'a>(to: Option<&'a str>, default: &'a str) -> &'a str {
    match to {
        Some(path) if is_local_path(path) => path,
        _ => default,
    }
}

/// A path that stays on this origin once a browser parses it. Browsers
/// strip tabs and newlines and read a backslash as `/`.
fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }
    if path
        .chars()
        .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
    {
        return false;
    }

    let Ok(base) = Url::parse("http://localhost/") else {
        return false;
    };
    base.join(path)
        .is_ok_and(|joined| joined.origin() == base.origin())
}
