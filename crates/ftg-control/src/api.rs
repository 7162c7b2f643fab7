//! Typed wrappers over [`ControlClient`] for each control server endpoint.

use crate::error::TransportError;
use crate::protocol::{
    ChatRequest, DaemonAction, ExecRequest, ExecResponse, HealthResponse, HealthState,
    LlmProvider, LogTailResponse, ProvidersResponse, SendMessageRequest, EXEC_ENDPOINT,
    HEALTH_ENDPOINT, LLM_CHAT_ENDPOINT, LLM_PROVIDERS_ENDPOINT, LOGS_TAIL_ENDPOINT,
    SEND_MESSAGE_ENDPOINT,
};
use crate::transport::ControlClient;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// LLM round-trips are slow; the daemon applies its own provider timeout.
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

fn to_body<T: Serialize>(body: &T) -> Result<Value, TransportError> {
    serde_json::to_value(body).map_err(|e| TransportError::Decode(e.to_string()))
}

fn from_body<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(TransportError::from)
}

impl ControlClient {
    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthState, TransportError> {
        let value = self.call(HEALTH_ENDPOINT, Method::GET, None, None).await?;
        Ok(from_body::<HealthResponse>(value)?.into())
    }

    /// `POST /exec {action}`.
    pub async fn exec(
        &self,
        action: DaemonAction,
        timeout: Option<Duration>,
    ) -> Result<ExecResponse, TransportError> {
        let body = to_body(&ExecRequest { action })?;
        let value = self
            .call(EXEC_ENDPOINT, Method::POST, Some(&body), timeout)
            .await?;
        from_body(value)
    }

    /// `GET /llm/providers`.
    pub async fn llm_providers(&self) -> Result<Vec<LlmProvider>, TransportError> {
        let value = self
            .call(LLM_PROVIDERS_ENDPOINT, Method::GET, None, None)
            .await?;
        Ok(from_body::<ProvidersResponse>(value)?.providers)
    }

    /// `POST /llm/chat {prompt}`; returns the response body verbatim.
    pub async fn llm_chat(&self, prompt: &str) -> Result<String, TransportError> {
        let body = to_body(&ChatRequest { prompt })?;
        self.call_text(LLM_CHAT_ENDPOINT, Method::POST, Some(&body), Some(CHAT_TIMEOUT))
            .await
    }

    /// `GET /logs/tail?lines=N`.
    pub async fn logs_tail(&self, lines: u32) -> Result<Vec<String>, TransportError> {
        let endpoint = format!("{}?lines={}", LOGS_TAIL_ENDPOINT, lines);
        let value = self.call(&endpoint, Method::GET, None, None).await?;
        Ok(from_body::<LogTailResponse>(value)?.lines)
    }

    /// `POST /send_message {chat, text}`; returns the response body verbatim.
    pub async fn send_message(&self, chat: &str, text: &str) -> Result<String, TransportError> {
        let body = to_body(&SendMessageRequest { chat, text })?;
        self.call_text(SEND_MESSAGE_ENDPOINT, Method::POST, Some(&body), None)
            .await
    }
}
