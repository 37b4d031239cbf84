//! Shared HTTP plumbing for the platform clients.
//!
//! Every service client is a thin typed layer over a [`Pipeline`], which resolves
//! URLs, injects authentication and user agent, runs an optional [`Interceptor`]
//! around the send, feeds the [`RequestRecorder`], and maps non-2xx responses to
//! [`ClientError::Response`](crate::ClientError::Response).
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config    - ClientConfig
//! ├── request   - Buffered request/response values
//! ├── transport - Transport trait and the reqwest implementation
//! ├── pipeline  - Pipeline and the Interceptor decorator seam
//! └── recorder  - Request recorders (request id, header accumulation, call trace)
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ClientConfig`] | Account, workspace, endpoint, credentials, timeouts |
//! | [`CapturedRequest`] | Immutable, replayable request snapshot |
//! | [`RawResponse`] | Fully buffered response |
//! | [`Transport`] | Sends a [`CapturedRequest`] |
//! | [`Pipeline`] | Per-service request pipeline |
//! | [`Interceptor`] | Before-send/after-receive decorator |
//! | [`IoHeadersRecorder`] | Propagates request ids and collects response headers |
//!
//! # Examples
//!
//! ```
//! use platform_clients::client::ClientConfig;
//!
//! let config = ClientConfig {
//!     account: "acme".into(),
//!     workspace: "dev".into(),
//!     user_agent: "my-app/1.0.0".into(),
//!     request_timeout_ms: 2000,
//!     ..Default::default()
//! };
//! assert!(config.enable_logging);
//! ```

mod config;
mod pipeline;
mod recorder;
mod request;
mod transport;

pub use config::{AuthFunc, ClientConfig};
pub use pipeline::{into_result, Interceptor, Pipeline};
pub use recorder::{CallTree, IoHeadersRecorder, RequestRecorder};
pub use request::{CapturedRequest, RawResponse};
pub use transport::{HttpTransport, Transport};
