//! ftg-control: client core for the local FTG control server.
//!
//! The control server is a loopback HTTP daemon (default `http://127.0.0.1:8787`)
//! that supervises the FTG bot process. This crate holds everything a control panel
//! needs short of drawing widgets: token storage, the authenticated transport,
//! cancellable polling, the lifecycle action slot, and settings load/save.
//!
//! Typical wiring:
//!
//! ```no_run
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! use ftg_control::{
//!     ActionCoordinator, ClientConfig, ControlClient, CredentialStore, DaemonAction,
//!     DashboardMonitor,
//! };
//! use std::sync::Arc;
//!
//! let config = ClientConfig::load()?;
//! let credentials = Arc::new(CredentialStore::from_config(&config));
//! let client = Arc::new(ControlClient::new(&config, credentials));
//! let monitor = Arc::new(DashboardMonitor::new(Arc::clone(&client)));
//! monitor.start_polling(config.health_poll_interval());
//! let actions = ActionCoordinator::new(client, Arc::clone(&monitor));
//! actions.dispatch(DaemonAction::Restart).await?;
//! # Ok(())
//! # }
//! ```

mod actions;
mod api;
mod config;
mod credentials;
mod error;
mod monitor;
mod poller;
mod protocol;
mod settings;
mod transport;

pub use actions::{ActionCoordinator, ActionOutcome, SlotState};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use credentials::{
    CredentialStore, MemoryBackend, PreferenceFile, SecretBackend, CONTROL_TOKEN_ENTRY,
    DEFAULT_CONTROL_TOKEN, LLM_API_KEY_ENTRY,
};
#[cfg(feature = "keyring")]
pub use credentials::KeychainBackend;
pub use error::{ActionRejected, SettingsError, StoreError, TransportError};
pub use monitor::{fetch_dashboard, DashboardMonitor, DashboardSnapshot, LogMonitor};
pub use poller::{PollHandle, PollSlot, Poller};
pub use protocol::{
    DaemonAction, ExecResponse, HealthState, LlmProvider, BOT_CONFIG_ENDPOINT, EXEC_ENDPOINT,
    HEALTH_ENDPOINT, LLM_CHAT_ENDPOINT, LLM_CONFIG_ENDPOINT, LLM_PROVIDERS_ENDPOINT,
    LOGS_TAIL_ENDPOINT, SEND_MESSAGE_ENDPOINT, TOKEN_HEADER,
};
pub use settings::{
    join_list, split_list, AutoReplyMode, BotConfigPayload, BotSettings, BotSettingsForm,
    LlmConfigPayload, LlmSettings, LlmSettingsForm, SettingsResource, SettingsSync,
    DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
};
pub use transport::ControlClient;

/// Re-exported so callers of [`ControlClient::call`] need not depend on reqwest.
pub use reqwest::Method;
