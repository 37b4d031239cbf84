//! HTTP transport.
//!
//! The [`Transport`] trait is the single point where bytes leave the process. It
//! reports every HTTP status as a [`RawResponse`]; only failures that produce no
//! response at all (connection refused, timeout, reset) become errors. Mapping
//! non-2xx statuses to [`ClientError::Response`](crate::ClientError::Response) is the
//! pipeline's job, after interceptors have had a look.
//!
//! # Examples
//!
//! ```ignore
//! use platform_clients::client::{CapturedRequest, HttpTransport, Transport};
//! use http::Method;
//!
//! let transport = HttpTransport::new(&Default::default())?;
//! let url = url::Url::parse("http://localhost:8080/healthcheck")?;
//! let response = transport.send(&CapturedRequest::new(Method::GET, url)).await?;
//! println!("Status: {}", response.status);
//! ```

use crate::client::config::ClientConfig;
use crate::client::request::{CapturedRequest, RawResponse};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Sends buffered requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the whole response.
    async fn send(&self, request: &CapturedRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport honouring the timeout and proxy settings of `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90));

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| ClientError::Config(format!("invalid proxy url: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &CapturedRequest) -> Result<RawResponse> {
        let mut req_builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if request.has_body() {
            req_builder = req_builder.body(request.body.clone());
        }

        let response = req_builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let config = ClientConfig {
            proxy_url: "http://[::1".into(),
            ..Default::default()
        };
        assert!(matches!(HttpTransport::new(&config), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_send_buffers_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/echo")
            .match_body("payload")
            .with_status(201)
            .with_header("etag", "h1")
            .with_body("stored")
            .create_async()
            .await;

        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        let url = url::Url::parse(&format!("{}/echo", server.url())).unwrap();
        let request = CapturedRequest::new(Method::PUT, url).with_body("payload");
        let response = transport.send(&request).await.unwrap();

        assert_eq!(response.status.as_u16(), 201);
        assert_eq!(response.etag(), "h1");
        assert_eq!(&response.body[..], b"stored");
        mock.assert_async().await;
    }
}
