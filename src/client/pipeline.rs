//! Request pipeline shared by every service client.
//!
//! The pipeline owns everything a request needs before and after the transport:
//!
//! 1. **URL resolution**: endpoint override or `http://{service}.{region}.vtex.io`,
//!    plus the `/{account}/{workspace}` prefix for workspace-bound services
//! 2. **Headers**: `User-Agent`, `Authorization: Bearer` (static or per request),
//!    recorder headers
//! 3. **Interception**: an optional [`Interceptor`] sees the request right before
//!    it is sent and the response right after it arrives
//! 4. **Recording**: the final response is handed to the configured recorder
//! 5. **Error mapping**: non-2xx responses become [`ClientError::Response`]
//!
//! # Examples
//!
//! ```ignore
//! use platform_clients::client::{ClientConfig, Pipeline};
//! use http::Method;
//!
//! let pipeline = Pipeline::new("vbase", &config, true)?;
//! let request = pipeline.request(Method::GET, ["buckets", "my-app", "userdata"])?;
//! let response = pipeline.send(request).await?;
//! ```

use crate::client::config::{AuthFunc, ClientConfig};
use crate::client::recorder::RequestRecorder;
use crate::client::request::{CapturedRequest, RawResponse};
use crate::client::transport::{HttpTransport, Transport};
use crate::error::{ClientError, Result};
use crate::protocol;
use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use http::Method;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Decorator around a single send.
///
/// `before_send` runs after the pipeline added its own headers; `after_receive`
/// runs before the response is recorded and mapped to an error. An interceptor may
/// replace the response, for instance by re-sending `request` through
/// [`Pipeline::dispatch`].
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Adjust the outgoing request
    fn before_send(&self, _request: &mut CapturedRequest) -> Result<()> {
        Ok(())
    }

    /// Inspect or replace the response. `request` is exactly what was sent.
    async fn after_receive(
        &self,
        _pipeline: &Pipeline,
        _request: &CapturedRequest,
        response: RawResponse,
    ) -> Result<RawResponse> {
        Ok(response)
    }
}

#[derive(Clone)]
enum Authorization {
    None,
    Static(HeaderValue),
    PerRequest(AuthFunc),
}

/// Base URL, default headers, transport and recorder of one service client.
#[derive(Clone)]
pub struct Pipeline {
    base_url: Url,
    transport: Arc<dyn Transport>,
    user_agent: Option<HeaderValue>,
    authorization: Authorization,
    recorder: Option<Arc<dyn RequestRecorder>>,
    enable_logging: bool,
}

impl Pipeline {
    /// Create a pipeline for `service` using the `reqwest` transport.
    ///
    /// Workspace-bound services require both account and workspace; the others
    /// require neither.
    pub fn new(service: &str, config: &ClientConfig, workspace_bound: bool) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::with_transport(service, config, workspace_bound, transport)
    }

    /// Create a pipeline sending through a custom transport
    pub fn with_transport(
        service: &str,
        config: &ClientConfig,
        workspace_bound: bool,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let has_context = !config.account.is_empty() || !config.workspace.is_empty();
        if workspace_bound && (config.account.is_empty() || config.workspace.is_empty()) {
            return Err(ClientError::Config(
                "missing account or workspace for workspace-bound client".to_string(),
            ));
        }
        if !workspace_bound && has_context {
            return Err(ClientError::Config(
                "non workspace-bound client with account or workspace config".to_string(),
            ));
        }

        let mut base = endpoint(service, config);
        if workspace_bound {
            base.push('/');
            base.push_str(&config.account);
            base.push('/');
            base.push_str(&config.workspace);
        }
        let base_url = Url::parse(&base)?;

        let user_agent = if config.user_agent.is_empty() {
            None
        } else {
            Some(HeaderValue::from_str(&config.user_agent)?)
        };
        let static_token = config.auth_token.as_deref().filter(|t| !t.is_empty());
        let authorization = match (static_token, &config.auth_func) {
            (Some(token), _) => Authorization::Static(bearer(token)?),
            (None, Some(func)) => Authorization::PerRequest(func.clone()),
            (None, None) => match config.credential() {
                Some(token) => Authorization::Static(bearer(&token)?),
                None => Authorization::None,
            },
        };

        Ok(Self {
            base_url,
            transport,
            user_agent,
            authorization,
            recorder: config.recorder.clone(),
            enable_logging: config.enable_logging,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether tracing events are enabled
    pub fn logging_enabled(&self) -> bool {
        self.enable_logging
    }

    /// Start a request for the path made of `segments`, relative to the base URL.
    ///
    /// Each segment is percent-encoded, including `/`, `?`, `#` and `%`.
    pub fn request<I, S>(&self, method: Method, segments: I) -> Result<CapturedRequest>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(CapturedRequest::new(method, url))
    }

    /// Send a request with no interceptor
    pub async fn send(&self, request: CapturedRequest) -> Result<RawResponse> {
        self.execute(request, None).await
    }

    /// Send a request through `interceptor`
    pub async fn send_with(
        &self,
        request: CapturedRequest,
        interceptor: &dyn Interceptor,
    ) -> Result<RawResponse> {
        self.execute(request, Some(interceptor)).await
    }

    /// Hand `request` to the transport as is, with no header injection, recording
    /// or error mapping.
    pub async fn dispatch(&self, request: &CapturedRequest) -> Result<RawResponse> {
        let response = self.transport.send(request).await;
        if self.enable_logging {
            match &response {
                Ok(res) => tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = res.status.as_u16(),
                    "request completed"
                ),
                Err(e) => tracing::warn!(
                    method = %request.method,
                    url = %request.url,
                    error = %e,
                    "request failed"
                ),
            }
        }
        response
    }

    async fn execute(
        &self,
        mut request: CapturedRequest,
        interceptor: Option<&dyn Interceptor>,
    ) -> Result<RawResponse> {
        if let Some(ua) = &self.user_agent {
            request.headers.insert(USER_AGENT, ua.clone());
        }
        match &self.authorization {
            Authorization::Static(value) => {
                request.headers.insert(AUTHORIZATION, value.clone());
            }
            Authorization::PerRequest(func) => {
                request.headers.insert(AUTHORIZATION, bearer(&func())?);
            }
            Authorization::None => {}
        }
        if let Some(interceptor) = interceptor {
            interceptor.before_send(&mut request)?;
        }
        if let Some(recorder) = &self.recorder {
            recorder.before_dial(&mut request);
        }

        let started = Instant::now();
        let mut response = self.dispatch(&request).await?;
        if let Some(interceptor) = interceptor {
            response = interceptor.after_receive(self, &request, response).await?;
        }

        if let Some(recorder) = &self.recorder {
            recorder.record(&request, &response, started.elapsed());
        }

        into_result(&request, response)
    }
}

/// Map a non-2xx response to [`ClientError::Response`].
pub fn into_result(request: &CapturedRequest, response: RawResponse) -> Result<RawResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let descr = protocol::parse_error_descriptor(&response.body);
    Err(ClientError::Response {
        status: response.status,
        code: descr.code,
        message: descr.message,
        url: request.url.to_string(),
    })
}

fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

fn endpoint(service: &str, config: &ClientConfig) -> String {
    match config.endpoint.as_deref().filter(|e| !e.is_empty()) {
        Some(e) if e.contains("://") => e.trim_end_matches('/').to_string(),
        Some(e) => format!("http://{}", e.trim_end_matches('/')),
        None => format!("http://{}.{}.vtex.io", service, config.region),
    }
}
