//! Client configuration.

use crate::client::recorder::RequestRecorder;
use crate::protocol::constants::CREDENTIAL_ENV;
use std::fmt;
use std::sync::Arc;

/// Produces a bearer token for each outgoing request.
pub type AuthFunc = Arc<dyn Fn() -> String + Send + Sync>;

/// Configuration shared by every platform client.
///
/// # Examples
///
/// ```
/// use platform_clients::client::ClientConfig;
///
/// let config = ClientConfig {
///     account: "acme".into(),
///     workspace: "dev".into(),
///     user_agent: "my-app/1.0.0".into(),
///     ..Default::default()
/// };
/// assert_eq!(config.region, "aws-us-east-1");
/// assert_eq!(config.request_timeout_ms, 5000);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Account the workspace belongs to
    pub account: String,
    /// Workspace requests are bound to
    pub workspace: String,
    /// Region used to build the default service endpoint
    pub region: String,
    /// Overrides the service endpoint (`host:port` or a full URL)
    pub endpoint: Option<String>,
    /// Bearer token; falls back to the `VTEX_CREDENTIAL` environment variable
    pub auth_token: Option<String>,
    /// Called for a fresh token on every request when `auth_token` is unset
    pub auth_func: Option<AuthFunc>,
    /// User agent, `{app}/{version}`; its app part names the buckets' owner
    pub user_agent: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Proxy for all requests; empty disables it
    pub proxy_url: String,
    /// Emit tracing events for requests and conflict resolution
    pub enable_logging: bool,
    /// Observes every request before dial and every response
    pub recorder: Option<Arc<dyn RequestRecorder>>,
}

impl ClientConfig {
    /// Bearer token to send, if any.
    pub fn credential(&self) -> Option<String> {
        self.auth_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(CREDENTIAL_ENV).ok().filter(|t| !t.is_empty()))
    }

    /// Fetch the token from `func` on every request
    pub fn with_auth_func(mut self, func: AuthFunc) -> Self {
        self.auth_func = Some(func);
        self
    }

    /// Attach a request recorder
    pub fn with_recorder(mut self, recorder: Arc<dyn RequestRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            workspace: String::new(),
            region: "aws-us-east-1".to_string(),
            endpoint: None,
            auth_token: None,
            auth_func: None,
            user_agent: String::new(),
            request_timeout_ms: 5000,
            proxy_url: String::new(),
            enable_logging: true,
            recorder: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("account", &self.account)
            .field("workspace", &self.workspace)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("auth_func", &self.auth_func.is_some())
            .field("user_agent", &self.user_agent)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("proxy_url", &self.proxy_url)
            .field("enable_logging", &self.enable_logging)
            .field("recorder", &self.recorder.is_some())
            .finish()
    }
}
