//! Wire-level constants and helpers shared by every client.
//!
//! # Headers
//!
//! | Header | Direction | Meaning |
//! |--------|-----------|---------|
//! | `X-Vtex-Detect-Conflicts` | request | Opt into 409 conflict detection instead of last-writer-wins |
//! | `X-Vtex-Solved-Conflicts` | response | Set by the client when a 409 was resolved transparently |
//! | `X-Vtex-Meta` | response | Smart-cache hints recorded for the parent response |
//! | `X-Request-Id` | request | Correlation id propagated to every child call |
//! | `X-Vtex-Trace-Enable` | request | Ask services to emit call traces |
//! | `ETag` | response | Content hash of the bucket or entry |

pub mod headers;

pub use headers::{etag, parse_error_descriptor, user_agent_name, ErrorDescriptor};

/// Protocol constants.
pub mod constants {
    /// Header names.
    pub mod headers {
        use http::header::HeaderName;

        /// Request header opting into conflict detection
        pub const DETECT_CONFLICTS: HeaderName = HeaderName::from_static("x-vtex-detect-conflicts");
        /// Response header naming the bucket whose conflicts were solved
        pub const SOLVED_CONFLICTS: HeaderName = HeaderName::from_static("x-vtex-solved-conflicts");
        /// Smart-cache metadata response header
        pub const SMART_CACHE: HeaderName = HeaderName::from_static("x-vtex-meta");
        /// Request correlation id
        pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
        /// Trace opt-in header
        pub const TRACE_ENABLE: HeaderName = HeaderName::from_static("x-vtex-trace-enable");
        /// Child call tree returned by traced services
        pub const CALL_TRACE: HeaderName = HeaderName::from_static("x-call-trace");
        /// Cache hit marker set by intermediate caches
        pub const FROM_CACHE: HeaderName = HeaderName::from_static("x-from-cache");
    }

    /// The canonical workspace every other workspace diverges from
    pub const MASTER_WORKSPACE: &str = "master";

    /// Environment variable consulted when no auth token is configured
    pub const CREDENTIAL_ENV: &str = "VTEX_CREDENTIAL";

    /// Error code used when a service error body carries none
    pub const UNDEFINED_ERROR_CODE: &str = "undefined";
}

/// Bucket store and metadata store endpoint paths.
///
/// Paths are returned as unescaped segments. The pipeline percent-encodes each
/// segment when it builds the URL, so `?`, `#` and `%` in bucket names, file paths
/// and keys stay path data. File paths and metadata keys are split on `/`.
pub mod paths {
    /// Segments of a path
    pub type Segments = Vec<String>;

    fn under(app: &str, bucket: &str, tail: &[&str]) -> Segments {
        ["buckets", app, bucket]
            .iter()
            .chain(tail)
            .map(|s| s.to_string())
            .collect()
    }

    fn nested(mut segments: Segments, path: &str) -> Segments {
        segments.extend(path.trim_start_matches('/').split('/').map(str::to_string));
        segments
    }

    /// `/buckets/{app}/{bucket}`
    pub fn bucket(app: &str, bucket: &str) -> Segments {
        under(app, bucket, &[])
    }

    /// `/buckets/{app}/{bucket}/state`
    pub fn bucket_state(app: &str, bucket: &str) -> Segments {
        under(app, bucket, &["state"])
    }

    /// `/buckets/{app}/{bucket}/files`
    pub fn file_list(app: &str, bucket: &str) -> Segments {
        under(app, bucket, &["files"])
    }

    /// `/buckets/{app}/{bucket}/files/{path}`
    pub fn file(app: &str, bucket: &str, path: &str) -> Segments {
        nested(file_list(app, bucket), path)
    }

    /// `/buckets/{app}/{bucket}/config/files/{path}`, the date-addressed store
    pub fn chronos_file(app: &str, bucket: &str, path: &str) -> Segments {
        nested(under(app, bucket, &["config", "files"]), path)
    }

    /// `/buckets/{app}/{bucket}/conflicts`
    pub fn conflicts(app: &str, bucket: &str) -> Segments {
        under(app, bucket, &["conflicts"])
    }

    /// `/buckets/{app}/{bucket}/metadata`
    pub fn metadata(app: &str, bucket: &str) -> Segments {
        under(app, bucket, &["metadata"])
    }

    /// `/buckets/{app}/{bucket}/metadata/{key}`
    pub fn metadata_key(app: &str, bucket: &str, key: &str) -> Segments {
        nested(metadata(app, bucket), key)
    }
}
