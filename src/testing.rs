//! Test doubles shared by the unit tests.

use crate::client::{CapturedRequest, ClientConfig, RawResponse, Transport};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, ETAG};
use http::StatusCode;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Transport answering from a script and remembering every request it saw.
///
/// Once the script runs out every request gets an empty 200.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse>>>,
    sent: Mutex<Vec<CapturedRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, message: &str) {
        self.script
            .lock()
            .push_back(Err(ClientError::Transport(message.to_string())));
    }

    pub fn sent(&self) -> Vec<CapturedRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &CapturedRequest) -> Result<RawResponse> {
        self.sent.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(status(StatusCode::OK)))
    }
}

pub fn status(status: StatusCode) -> RawResponse {
    RawResponse::new(status, HeaderMap::new(), "")
}

pub fn json(status: StatusCode, etag: &'static str, body: &str) -> RawResponse {
    let mut headers = HeaderMap::new();
    headers.insert(ETAG, HeaderValue::from_static(etag));
    RawResponse::new(status, headers, body.to_string())
}

pub fn config(workspace: &str) -> ClientConfig {
    ClientConfig {
        account: "acme".into(),
        workspace: workspace.into(),
        endpoint: Some("localhost:1".into()),
        auth_token: Some("tok".into()),
        user_agent: "My-App/1.0.0".into(),
        ..Default::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
