//! `Authorization: Bearer <token>` parsing.
//!
//! A header that does not carry a well-formed bearer credential means "no
//! credential presented". It is never an error.

use http::HeaderMap;

/// Authorization header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// The accepted authentication scheme (matched case-insensitively).
pub const BEARER_SCHEME: &str = "Bearer";

/// Extracts the token from an `Authorization` header value.
///
/// The value must split on single spaces into exactly two parts (trailing
/// empty parts are ignored), the first being `Bearer` in any case and the
/// second a non-blank token.
///
/// # Example
///
/// ```
/// use bastion_identity::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(parse_bearer("bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
/// assert_eq!(parse_bearer("Bearer"), None);
/// ```
#[must_use]
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts: Vec<&str> = value.split(' ').collect();
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }

    match parts.as_slice() {
        [scheme, token]
            if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.trim().is_empty() =>
        {
            Some(*token)
        }
        _ => None,
    }
}

/// Extracts the bearer token from request headers, if one is presented.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION_HEADER)?.to_str().ok()?;
    parse_bearer(value)
}
