//! Load / edit / save cycle for remote configuration resources.
//!
//! A [`SettingsResource`] maps the server's `config` object into an editable form
//! and builds a partial payload back. Fields the form cannot express confidently
//! (empty lists, unparsable numbers) are left out of the payload so the daemon
//! keeps its current value. Fields unknown to the form are never sent.

use crate::credentials::CredentialStore;
use crate::error::{SettingsError, StoreError, TransportError};
use crate::protocol::{LlmProvider, BOT_CONFIG_ENDPOINT, LLM_CONFIG_ENDPOINT};
use crate::transport::ControlClient;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// A server-held configuration object edited through a form.
pub trait SettingsResource: Send + Sync {
    type Form: Clone + Send;
    type Payload: Serialize;

    /// Short name used in logs.
    const NAME: &'static str;
    const ENDPOINT: &'static str;

    /// Build the form from the response's `config` object, defaulting absent fields.
    fn form_from_remote(&self, config: &Map<String, Value>) -> Self::Form;

    /// Build the outgoing payload from the form's owned fields.
    fn payload_from_form(&self, form: &Self::Form) -> Self::Payload;
}

pub struct SettingsSync<R: SettingsResource> {
    client: Arc<ControlClient>,
    resource: R,
    status: Mutex<String>,
}

impl<R: SettingsResource> SettingsSync<R> {
    pub fn new(client: Arc<ControlClient>, resource: R) -> Self {
        Self {
            client,
            resource,
            status: Mutex::new(String::new()),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Outcome of the last load or save, for display. Empty before the first call.
    pub fn last_status(&self) -> String {
        match self.status.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_status(&self, status: String) {
        match self.status.lock() {
            Ok(mut s) => *s = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    pub async fn load(&self) -> Result<R::Form, SettingsError> {
        let result = self.fetch_form().await;
        match &result {
            Ok(_) => {
                tracing::info!(resource = R::NAME, "settings loaded");
                self.set_status("Loaded".to_string());
            }
            Err(e) => {
                tracing::warn!(resource = R::NAME, error = %e, "settings load failed");
                self.set_status(e.to_string());
            }
        }
        result
    }

    async fn fetch_form(&self) -> Result<R::Form, SettingsError> {
        let body = self
            .client
            .call(R::ENDPOINT, Method::GET, None, None)
            .await
            .map_err(SettingsError::Load)?;
        let config = body.get("config").and_then(Value::as_object).ok_or_else(|| {
            SettingsError::Load(TransportError::Decode(
                "response has no config object".to_string(),
            ))
        })?;
        Ok(self.resource.form_from_remote(config))
    }

    /// The JSON body `save` would send for `form`.
    pub fn payload(&self, form: &R::Form) -> Result<Value, SettingsError> {
        serde_json::to_value(self.resource.payload_from_form(form))
            .map_err(|e| SettingsError::Save(TransportError::Decode(e.to_string())))
    }

    pub async fn save(&self, form: &R::Form) -> Result<(), SettingsError> {
        let result = self.push(form).await;
        match &result {
            Ok(()) => {
                tracing::info!(resource = R::NAME, "settings saved");
                self.set_status("Saved".to_string());
            }
            Err(e) => {
                tracing::warn!(resource = R::NAME, error = %e, "settings save failed");
                self.set_status(e.to_string());
            }
        }
        result
    }

    async fn push(&self, form: &R::Form) -> Result<(), SettingsError> {
        let payload = self.payload(form)?;
        self.client
            .call(R::ENDPOINT, Method::POST, Some(&payload), None)
            .await
            .map_err(SettingsError::Save)?;
        Ok(())
    }
}

/// Comma-separated form text to a list. `None` when nothing remains after trimming,
/// so an empty field never clears the server-side list.
pub fn split_list(text: &str) -> Option<Vec<String>> {
    let items: Vec<String> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Remote list (strings or numeric chat ids) to comma-separated form text.
pub fn join_list(value: Option<&Value>) -> String {
    let Some(Value::Array(items)) = value else {
        return String::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn get_bool(config: &Map<String, Value>, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn get_string(config: &Map<String, Value>, key: &str, default: &str) -> String {
    config
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

// ---------------------------------------------------------------------------
// Bot behavior (/bot/config)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoReplyMode {
    #[default]
    Off,
    MentionsOnly,
    All,
}

impl AutoReplyMode {
    pub const ALL: [AutoReplyMode; 3] = [
        AutoReplyMode::Off,
        AutoReplyMode::MentionsOnly,
        AutoReplyMode::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AutoReplyMode::Off => "off",
            AutoReplyMode::MentionsOnly => "mentions_only",
            AutoReplyMode::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            AutoReplyMode::Off => "Off",
            AutoReplyMode::MentionsOnly => "Mentions only",
            AutoReplyMode::All => "All",
        }
    }
}

/// Editable bot settings. List and numeric fields hold raw form text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettingsForm {
    pub auto_reply_enabled: bool,
    pub auto_reply_mode: AutoReplyMode,
    pub allowlist: String,
    pub blocklist: String,
    pub silent_reading: bool,
    pub min_reply_interval: String,
    pub reply_prompt: String,
}

impl Default for BotSettingsForm {
    fn default() -> Self {
        Self {
            auto_reply_enabled: false,
            auto_reply_mode: AutoReplyMode::Off,
            allowlist: String::new(),
            blocklist: String::new(),
            silent_reading: true,
            min_reply_interval: "5".to_string(),
            reply_prompt: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotConfigPayload {
    pub auto_reply_enabled: bool,
    pub auto_reply_mode: AutoReplyMode,
    pub silent_reading: bool,
    pub reply_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_reply_interval_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowlist_chats: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocklist_chats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BotSettings;

impl SettingsResource for BotSettings {
    type Form = BotSettingsForm;
    type Payload = BotConfigPayload;

    const NAME: &'static str = "bot";
    const ENDPOINT: &'static str = BOT_CONFIG_ENDPOINT;

    fn form_from_remote(&self, config: &Map<String, Value>) -> BotSettingsForm {
        let defaults = BotSettingsForm::default();
        let mode = config.get("auto_reply_mode").and_then(Value::as_str);
        let auto_reply_mode = match mode {
            Some(raw) => AutoReplyMode::parse(raw).unwrap_or_else(|| {
                tracing::warn!(mode = raw, "unknown auto_reply_mode; showing off");
                AutoReplyMode::Off
            }),
            None => defaults.auto_reply_mode,
        };
        let min_reply_interval = config
            .get("min_reply_interval_seconds")
            .and_then(Value::as_i64)
            .map(|n| n.to_string())
            .unwrap_or(defaults.min_reply_interval);

        BotSettingsForm {
            auto_reply_enabled: get_bool(config, "auto_reply_enabled", defaults.auto_reply_enabled),
            auto_reply_mode,
            allowlist: join_list(config.get("allowlist_chats")),
            blocklist: join_list(config.get("blocklist_chats")),
            silent_reading: get_bool(config, "silent_reading", defaults.silent_reading),
            min_reply_interval,
            reply_prompt: get_string(config, "reply_prompt", &defaults.reply_prompt),
        }
    }

    fn payload_from_form(&self, form: &BotSettingsForm) -> BotConfigPayload {
        BotConfigPayload {
            auto_reply_enabled: form.auto_reply_enabled,
            auto_reply_mode: form.auto_reply_mode,
            silent_reading: form.silent_reading,
            reply_prompt: form.reply_prompt.clone(),
            min_reply_interval_seconds: form.min_reply_interval.trim().parse::<i64>().ok(),
            allowlist_chats: split_list(&form.allowlist),
            blocklist_chats: split_list(&form.blocklist),
        }
    }
}

// ---------------------------------------------------------------------------
// LLM provider (/llm/config)
// ---------------------------------------------------------------------------

pub const DEFAULT_LLM_BASE_URL: &str = "http://127.0.0.1:1234/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-oss:latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettingsForm {
    pub base_url: String,
    pub model: String,
    /// Optional; sent only when non-empty.
    pub api_key: String,
    pub request_timeout: String,
}

impl Default for LlmSettingsForm {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: String::new(),
            request_timeout: "60".to_string(),
        }
    }
}

impl LlmSettingsForm {
    /// Take the first provider's base URL as the form's base URL. Returns whether the
    /// form changed; an empty list or a blank URL leaves it alone.
    pub fn offer_default_provider(&mut self, providers: &[LlmProvider]) -> bool {
        match providers.first().map(|p| p.base_url.trim()) {
            Some(url) if !url.is_empty() && url != self.base_url => {
                self.base_url = url.to_string();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmConfigPayload {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// The daemon redacts the API key in `GET /llm/config`, so the form's key comes
/// from the local secure store.
pub struct LlmSettings {
    credentials: Arc<CredentialStore>,
}

impl LlmSettings {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Form with defaults and the locally stored API key, before any load.
    pub fn initial_form(&self) -> LlmSettingsForm {
        LlmSettingsForm {
            api_key: self.credentials.llm_api_key().unwrap_or_default(),
            ..LlmSettingsForm::default()
        }
    }
}

fn format_seconds(value: &Value) -> Option<String> {
    if let Some(n) = value.as_i64() {
        return Some(n.to_string());
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

impl SettingsResource for LlmSettings {
    type Form = LlmSettingsForm;
    type Payload = LlmConfigPayload;

    const NAME: &'static str = "llm";
    const ENDPOINT: &'static str = LLM_CONFIG_ENDPOINT;

    fn form_from_remote(&self, config: &Map<String, Value>) -> LlmSettingsForm {
        let defaults = self.initial_form();
        LlmSettingsForm {
            base_url: get_string(config, "base_url", &defaults.base_url),
            model: get_string(config, "model", &defaults.model),
            request_timeout: config
                .get("request_timeout_seconds")
                .and_then(format_seconds)
                .unwrap_or(defaults.request_timeout),
            api_key: defaults.api_key,
        }
    }

    fn payload_from_form(&self, form: &LlmSettingsForm) -> LlmConfigPayload {
        let api_key = form.api_key.trim();
        LlmConfigPayload {
            base_url: form.base_url.trim().to_string(),
            model: form.model.trim().to_string(),
            request_timeout_seconds: form
                .request_timeout
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t > 0.0),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
        }
    }
}

impl SettingsSync<LlmSettings> {
    /// Known providers. Pass the list to [`LlmSettingsForm::offer_default_provider`]
    /// to suggest the first one's base URL.
    pub async fn load_providers(&self) -> Result<Vec<LlmProvider>, SettingsError> {
        let result = self.client.llm_providers().await.map_err(SettingsError::Load);
        match &result {
            Ok(providers) => {
                tracing::info!(count = providers.len(), "LLM providers loaded");
                self.set_status(format!("Loaded {} providers", providers.len()));
            }
            Err(e) => self.set_status(e.to_string()),
        }
        result
    }

    /// Keep a non-empty form key in the local secure store so it survives the
    /// daemon's redaction on the next load.
    pub fn remember_api_key(&self, form: &LlmSettingsForm) -> Result<(), StoreError> {
        let key = form.api_key.trim();
        if key.is_empty() {
            return Ok(());
        }
        self.resource.credentials.save_llm_api_key(key)
    }
}
