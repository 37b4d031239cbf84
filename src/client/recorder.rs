//! Request recording.
//!
//! A [`RequestRecorder`] sees every request right before it is dialed and every
//! response once it is final. [`IoHeadersRecorder`] uses this to propagate a request
//! id to child calls and to accumulate the response headers a parent response must
//! forward (`X-Vtex-Meta` and `X-Vtex-Solved-Conflicts`).

use crate::client::request::{CapturedRequest, RawResponse};
use crate::protocol::constants::headers;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Observes requests and their final responses.
pub trait RequestRecorder: Send + Sync {
    /// Called with the outgoing request right before it is sent
    fn before_dial(&self, request: &mut CapturedRequest);

    /// Called with the final response of a request
    fn record(&self, request: &CapturedRequest, response: &RawResponse, elapsed: Duration);
}

/// One node of a call trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTree {
    /// `METHOD url`
    pub call: String,
    /// Response status
    pub status: u16,
    /// `hit` or `miss`
    pub cache: String,
    /// Response time in milliseconds
    pub time: u64,
    /// Calls made by the callee, when it reported them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CallTree>,
}

const HEADERS_TO_RECORD: [HeaderName; 2] = [headers::SMART_CACHE, headers::SOLVED_CONFLICTS];

#[derive(Debug, Default)]
struct RecorderState {
    recorded: HeaderMap,
    call_trace: Vec<CallTree>,
    written: bool,
}

/// Recorder that propagates the request id and accumulates response headers.
#[derive(Debug)]
pub struct IoHeadersRecorder {
    request_id: String,
    enable_trace: bool,
    state: RwLock<RecorderState>,
}

impl IoHeadersRecorder {
    /// Create a recorder for a parent request.
    ///
    /// The request id and trace flag are taken from the parent headers when present;
    /// a fresh UUID is generated otherwise.
    pub fn new(parent: Option<&HeaderMap>) -> Self {
        let header = |name: &HeaderName| {
            parent
                .and_then(|h| h.get(name))
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let enable_trace = header(&headers::TRACE_ENABLE)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        let request_id = header(&headers::REQUEST_ID)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request_id,
            enable_trace,
            state: RwLock::new(RecorderState::default()),
        }
    }

    /// Request id propagated to child calls
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Copy the accumulated headers (and the call trace, if enabled) into `out`.
    pub fn add_response_headers(&self, out: &mut HeaderMap) {
        let mut state = self.state.write();
        state.written = true;

        for (name, value) in state.recorded.iter() {
            out.append(name.clone(), value.clone());
        }

        if self.enable_trace {
            match serde_json::to_string(&state.call_trace) {
                Ok(trace) => match HeaderValue::from_str(&trace) {
                    Ok(value) => {
                        out.insert(headers::CALL_TRACE, value);
                    }
                    Err(e) => tracing::error!(error = %e, "call trace is not a valid header value"),
                },
                Err(e) => tracing::error!(error = %e, "failed to marshal call trace"),
            }
        }
    }

    /// Forget the recorded smart-cache headers
    pub fn clear_smart_cache_headers(&self) {
        self.state.write().recorded.remove(headers::SMART_CACHE);
    }

    /// Recorded values of `name`
    pub fn recorded(&self, name: &HeaderName) -> Vec<String> {
        self.state
            .read()
            .recorded
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// Snapshot of the call trace
    pub fn call_trace(&self) -> Vec<CallTree> {
        self.state.read().call_trace.clone()
    }
}

impl RequestRecorder for IoHeadersRecorder {
    fn before_dial(&self, request: &mut CapturedRequest) {
        if self.enable_trace {
            request
                .headers
                .insert(headers::TRACE_ENABLE, HeaderValue::from_static("true"));
        }
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            request.headers.insert(headers::REQUEST_ID, value);
        }
    }

    fn record(&self, request: &CapturedRequest, response: &RawResponse, elapsed: Duration) {
        let mut state = self.state.write();

        let is_read = request.method == http::Method::GET || request.method == http::Method::HEAD;
        if state.written && is_read {
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                "request recorded after parent response already written"
            );
        }

        for name in HEADERS_TO_RECORD.iter() {
            for value in response.headers.get_all(name) {
                state.recorded.append(name.clone(), value.clone());
            }
        }

        if self.enable_trace {
            let raw = response
                .headers
                .get(headers::CALL_TRACE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let children = if raw.is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(raw).unwrap_or_else(|e| {
                    tracing::error!(
                        error = %e,
                        url = %request.url,
                        "failed to unmarshal child call trace"
                    );
                    Vec::new()
                })
            };
            let cache = if response.headers.contains_key(headers::FROM_CACHE) {
                "hit"
            } else {
                "miss"
            };

            state.call_trace.push(CallTree {
                call: format!("{} {}", request.method, request.url),
                status: response.status.as_u16(),
                cache: cache.to_string(),
                time: elapsed.as_millis() as u64,
                children,
            });
        }
    }
}
