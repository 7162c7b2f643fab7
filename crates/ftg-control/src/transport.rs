//! Authenticated HTTP transport to the control server.
//!
//! Every request carries the token resolved from the [`CredentialStore`] at call
//! time, so a saved token takes effect on the next request. No retries happen
//! here; callers decide what to do with a failure.

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::TransportError;
use crate::protocol::TOKEN_HEADER;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    default_timeout: Duration,
}

impl ControlClient {
    pub fn new(config: &ClientConfig, credentials: Arc<CredentialStore>) -> Self {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            default_timeout: config.request_timeout(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON body.
    ///
    /// `endpoint` is a path (optionally with a query string) relative to the base URL.
    /// `timeout` falls back to the configured default.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        let (value, _) = self.send(endpoint, method, body, timeout).await?;
        Ok(value)
    }

    /// Like [`call`](Self::call) but returns the raw body text (still required to be JSON).
    pub async fn call_text(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<String, TransportError> {
        let (_, text) = self.send(endpoint, method, body, timeout).await?;
        Ok(text)
    }

    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<(Value, String), TransportError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(TOKEN_HEADER, self.credentials.resolve())
            .timeout(timeout.unwrap_or(self.default_timeout));
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        tracing::debug!(%method, endpoint, status = status.as_u16(), "control request");
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let text = res.text().await?;
        let value = serde_json::from_str::<Value>(&text)?;
        Ok((value, text))
    }
}
