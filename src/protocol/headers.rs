//! Shared header and error-body parsing.
//!
//! # Formats
//!
//! | Input | Format | Example |
//! |-------|--------|---------|
//! | User-Agent | `{app}/{version}` | `my-app/1.2.0` |
//! | ETag | opaque token | `"a1b2c3"` |
//! | Error body | JSON `{code, message}` | `{"code":"E1","message":"nope"}` |

use super::constants::UNDEFINED_ERROR_CODE;
use http::header::{HeaderMap, ETAG};
use serde::Deserialize;

/// Error description reported by the services in non-2xx bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDescriptor {
    /// Machine-readable error code
    #[serde(default)]
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Derive the application name from a user agent.
///
/// Takes everything before the first `/` and lowercases it.
///
/// # Examples
///
/// ```
/// use platform_clients::protocol::user_agent_name;
///
/// assert_eq!(user_agent_name("My-App/1.0.0"), "my-app");
/// assert_eq!(user_agent_name("bare"), "bare");
/// assert_eq!(user_agent_name(""), "");
/// ```
pub fn user_agent_name(user_agent: &str) -> String {
    user_agent
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Read the `ETag` header, or an empty string if absent.
pub fn etag(headers: &HeaderMap) -> String {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Parse a service error body.
///
/// Falls back to code `undefined` with the raw body as message when the body is not
/// JSON or lacks either field.
///
/// # Examples
///
/// ```
/// use platform_clients::protocol::parse_error_descriptor;
///
/// let d = parse_error_descriptor(br#"{"code":"E1","message":"nope"}"#);
/// assert_eq!(d.code, "E1");
///
/// let d = parse_error_descriptor(b"gateway exploded");
/// assert_eq!(d.code, "undefined");
/// assert_eq!(d.message, "gateway exploded");
/// ```
pub fn parse_error_descriptor(body: &[u8]) -> ErrorDescriptor {
    match serde_json::from_slice::<ErrorDescriptor>(body) {
        Ok(descr) if !descr.code.is_empty() && !descr.message.is_empty() => descr,
        _ => ErrorDescriptor {
            code: UNDEFINED_ERROR_CODE.to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
