use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Login page protected views send anonymous users to.
pub const LOGIN_URL: &str = "/auth/login/";

/// Characters left as-is in the `next` parameter. `/` stays readable.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// `/auth/login/?next=<path>` for the page the user tried to open.
pub fn login_url(next: &str) -> String {
    format!(
        "{LOGIN_URL}?next={}",
        utf8_percent_encode(next, NEXT_ENCODE_SET)
    )
}

/// Accept a post-login redirect target only when it stays on this site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then_some(next)
}
