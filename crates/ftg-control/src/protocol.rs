//! Wire types for the control server endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the control token on every request.
pub const TOKEN_HEADER: &str = "X-FTG-Token";

pub const HEALTH_ENDPOINT: &str = "/health";
pub const EXEC_ENDPOINT: &str = "/exec";
pub const LLM_PROVIDERS_ENDPOINT: &str = "/llm/providers";
pub const LLM_CONFIG_ENDPOINT: &str = "/llm/config";
pub const LLM_CHAT_ENDPOINT: &str = "/llm/chat";
pub const LOGS_TAIL_ENDPOINT: &str = "/logs/tail";
pub const SEND_MESSAGE_ENDPOINT: &str = "/send_message";
pub const BOT_CONFIG_ENDPOINT: &str = "/bot/config";

/// Last-known daemon health. `ftg_status` is the `ftg` field of `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub status: String,
    pub ftg_status: String,
}

impl HealthState {
    /// Initial value before the first refresh.
    pub fn unknown() -> Self {
        Self {
            status: "unknown".to_string(),
            ftg_status: "unknown".to_string(),
        }
    }

    /// Value published after any failed refresh.
    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
            ftg_status: "unknown".to_string(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ftg: String,
}

impl From<HealthResponse> for HealthState {
    fn from(res: HealthResponse) -> Self {
        Self {
            status: res.status,
            ftg_status: res.ftg,
        }
    }
}

/// Lifecycle command accepted by `/exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonAction {
    Start,
    Stop,
    Restart,
    Status,
}

impl DaemonAction {
    pub const ALL: [DaemonAction; 4] = [
        DaemonAction::Start,
        DaemonAction::Stop,
        DaemonAction::Restart,
        DaemonAction::Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DaemonAction::Start => "start",
            DaemonAction::Stop => "stop",
            DaemonAction::Restart => "restart",
            DaemonAction::Status => "status",
        }
    }
}

impl fmt::Display for DaemonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExecRequest {
    pub action: DaemonAction,
}

/// Body of an `/exec` response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProvider {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<LlmProvider>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogTailResponse {
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat: &'a str,
    pub text: &'a str,
}
