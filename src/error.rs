//! Error types for the platform clients.
//!
//! Every fallible operation in this crate returns [`Result<T>`], whose error side is
//! [`ClientError`]. The variants follow the layers a call passes through:
//!
//! | Layer | Variants |
//! |-------|----------|
//! | Configuration | [`ClientError::Config`], [`ClientError::MissingUserAgent`] |
//! | Request building | [`ClientError::InvalidUrl`], [`ClientError::InvalidHeader`], [`ClientError::Json`] |
//! | Transport | [`ClientError::Transport`] |
//! | Service response | [`ClientError::Response`] |
//! | Conflict protocol | [`ClientError::ResolutionFailed`], [`ClientError::ConflictsNotSolved`], [`ClientError::StillConflicting`] |
//! | Batch operations | [`ClientError::Patch`] |

use http::StatusCode;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised by the platform clients.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or timeout failure before any response was received
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status
    #[error("({status} {code} at {url}) {message}")]
    Response {
        /// HTTP status code returned by the service
        status: StatusCode,
        /// Service-reported error code, `undefined` when the body carried none
        code: String,
        /// Service-reported message or the raw response body
        message: String,
        /// URL of the failed request
        url: String,
    },

    /// The conflict resolver failed mechanically
    #[error("Error resolving conflicts in bucket {bucket}: {source}")]
    ResolutionFailed {
        /// Bucket whose conflicts were being resolved
        bucket: String,
        /// Error returned by the resolver
        #[source]
        source: Box<ClientError>,
    },

    /// The conflict resolver declined to resolve the conflicts
    #[error("Conflicts could not be solved in bucket {bucket}")]
    ConflictsNotSolved {
        /// Bucket left in conflict
        bucket: String,
    },

    /// The replayed request hit a conflict again
    #[error("Bucket {bucket} still has conflicts after resolution attempt")]
    StillConflicting {
        /// Bucket that kept conflicting
        bucket: String,
    },

    /// One or more operations of a metadata patch failed
    #[error("Error(s) in metadata patch in bucket {bucket}: {}", errors.join("; "))]
    Patch {
        /// Bucket the patch was applied to
        bucket: String,
        /// One message per failed operation
        errors: Vec<String>,
    },

    /// The user agent needed to derive the application name is missing
    #[error("User-Agent is missing to create a {0} client")]
    MissingUserAgent(&'static str),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Application-defined failure, typically raised from a conflict resolver
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Status code of a service response error, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a plain 409 response from the service
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    /// Check if this error is a 404 response from the service
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Check if this error came out of the conflict resolution protocol
    pub fn is_conflict_resolution(&self) -> bool {
        matches!(
            self,
            ClientError::ResolutionFailed { .. }
                | ClientError::ConflictsNotSolved { .. }
                | ClientError::StillConflicting { .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ClientError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        ClientError::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ClientError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        ClientError::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode) -> ClientError {
        ClientError::Response {
            status,
            code: "undefined".to_string(),
            message: "boom".to_string(),
            url: "http://localhost/x".to_string(),
        }
    }

    #[test]
    fn test_status_helpers() {
        assert!(response(StatusCode::CONFLICT).is_conflict());
        assert!(response(StatusCode::NOT_FOUND).is_not_found());
        assert!(!ClientError::Transport("reset".into()).is_conflict());
    }

    #[test]
    fn test_declined_and_failed_messages_differ() {
        let declined = ClientError::ConflictsNotSolved { bucket: "b".into() };
        let failed = ClientError::ResolutionFailed {
            bucket: "b".into(),
            source: Box::new(ClientError::Transport("reset".into())),
        };
        assert_ne!(declined.to_string(), failed.to_string());
        assert!(declined.is_conflict_resolution());
        assert!(failed.is_conflict_resolution());
    }

    #[test]
    fn test_patch_error_joins_messages() {
        let err = ClientError::Patch {
            bucket: "b".into(),
            errors: vec!["Delete a: x".into(), "Delete b: y".into()],
        };
        assert_eq!(
            err.to_string(),
            "Error(s) in metadata patch in bucket b: Delete a: x; Delete b: y"
        );
    }
}
