//! Channel between the egui thread and the tokio runtime.
//!
//! The UI thread only calls `try_send` / `try_recv`; every network call runs as a
//! task on the runtime and reports back with a [`PanelEvent`] followed by a repaint
//! request.

use ftg_control::{
    ActionCoordinator, ActionOutcome, ActionRejected, BotSettings, BotSettingsForm, ClientConfig,
    ControlClient, CredentialStore, DaemonAction, DashboardMonitor, LlmProvider, LlmSettings,
    LlmSettingsForm, LogMonitor, SettingsError, SettingsSync, StoreError, TransportError,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Requests from the UI.
#[derive(Clone)]
pub enum PanelCommand {
    RefreshDashboard,
    Action(DaemonAction),
    RefreshLogs,
    SetLogAutoRefresh(bool),
    SaveToken(String),
    PingServer,
    LoadBot,
    SaveBot(BotSettingsForm),
    LoadLlm,
    SaveLlm(LlmSettingsForm),
    /// `offer_default` puts the first provider's base URL into the form.
    LoadProviders { offer_default: bool },
    TestChat(String),
    SendMessage { chat: String, text: String },
}

impl PanelCommand {
    /// Log label; never includes field values.
    pub fn name(&self) -> &'static str {
        match self {
            PanelCommand::RefreshDashboard => "refresh_dashboard",
            PanelCommand::Action(_) => "action",
            PanelCommand::RefreshLogs => "refresh_logs",
            PanelCommand::SetLogAutoRefresh(_) => "set_log_auto_refresh",
            PanelCommand::SaveToken(_) => "save_token",
            PanelCommand::PingServer => "ping_server",
            PanelCommand::LoadBot => "load_bot",
            PanelCommand::SaveBot(_) => "save_bot",
            PanelCommand::LoadLlm => "load_llm",
            PanelCommand::SaveLlm(_) => "save_llm",
            PanelCommand::LoadProviders { .. } => "load_providers",
            PanelCommand::TestChat(_) => "test_chat",
            PanelCommand::SendMessage { .. } => "send_message",
        }
    }
}

/// Results delivered back to the UI.
#[derive(Debug)]
pub enum PanelEvent {
    ActionFinished(Result<ActionOutcome, ActionRejected>),
    TokenSaved(Result<(), StoreError>),
    Ping(Result<String, TransportError>),
    BotLoaded(Result<BotSettingsForm, SettingsError>),
    BotSaved(Result<(), SettingsError>),
    LlmLoaded(Result<LlmSettingsForm, SettingsError>),
    LlmSaved(Result<(), String>),
    Providers {
        result: Result<Vec<LlmProvider>, SettingsError>,
        offer_default: bool,
    },
    ChatReply(Result<String, TransportError>),
    MessageSent(Result<String, TransportError>),
}

/// Long-lived client objects shared by every task the bridge spawns.
pub struct PanelCore {
    pub config: ClientConfig,
    pub credentials: Arc<CredentialStore>,
    pub client: Arc<ControlClient>,
    pub dashboard: Arc<DashboardMonitor>,
    pub logs: Arc<LogMonitor>,
    pub actions: Arc<ActionCoordinator>,
    pub bot: Arc<SettingsSync<BotSettings>>,
    pub llm: Arc<SettingsSync<LlmSettings>>,
}

impl PanelCore {
    pub fn new(config: ClientConfig) -> Self {
        let credentials = Arc::new(CredentialStore::from_config(&config));
        let client = Arc::new(ControlClient::new(&config, Arc::clone(&credentials)));
        let dashboard = Arc::new(DashboardMonitor::new(Arc::clone(&client)));
        let logs = Arc::new(LogMonitor::new(Arc::clone(&client), config.log_tail_lines));
        let actions = Arc::new(ActionCoordinator::new(
            Arc::clone(&client),
            Arc::clone(&dashboard),
        ));
        let bot = Arc::new(SettingsSync::new(Arc::clone(&client), BotSettings));
        let llm = Arc::new(SettingsSync::new(
            Arc::clone(&client),
            LlmSettings::new(Arc::clone(&credentials)),
        ));
        Self {
            config,
            credentials,
            client,
            dashboard,
            logs,
            actions,
            bot,
            llm,
        }
    }
}

pub type PanelSender = mpsc::Sender<PanelCommand>;
pub type PanelReceiver = mpsc::UnboundedReceiver<PanelEvent>;

/// Start the dispatcher and the repaint watchers on `runtime`.
pub fn spawn_bridge(
    runtime: &Handle,
    core: Arc<PanelCore>,
    ctx: egui::Context,
    capacity: usize,
) -> (PanelSender, PanelReceiver) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<PanelCommand>(capacity);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    // Published state changes repaint the window without an event.
    let mut dashboard_rx = core.dashboard.subscribe();
    let repaint = ctx.clone();
    runtime.spawn(async move {
        while dashboard_rx.changed().await.is_ok() {
            repaint.request_repaint();
        }
    });
    let mut logs_rx = core.logs.subscribe();
    let repaint = ctx.clone();
    runtime.spawn(async move {
        while logs_rx.changed().await.is_ok() {
            repaint.request_repaint();
        }
    });

    let dispatcher = runtime.clone();
    runtime.spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            tracing::debug!(command = cmd.name(), "panel command");
            let core = Arc::clone(&core);
            let events = event_tx.clone();
            let ctx = ctx.clone();
            dispatcher.spawn(async move {
                if let Some(event) = run_command(&core, cmd).await {
                    let _ = events.send(event);
                }
                ctx.request_repaint();
            });
        }
        tracing::debug!("panel bridge closed");
    });

    (cmd_tx, event_rx)
}

async fn run_command(core: &PanelCore, cmd: PanelCommand) -> Option<PanelEvent> {
    let event = match cmd {
        PanelCommand::RefreshDashboard => {
            // Outcome lands in the dashboard snapshot.
            let _ = core.dashboard.refresh().await;
            return None;
        }
        PanelCommand::Action(action) => {
            PanelEvent::ActionFinished(core.actions.dispatch(action).await)
        }
        PanelCommand::RefreshLogs => {
            core.logs.refresh().await;
            return None;
        }
        PanelCommand::SetLogAutoRefresh(enabled) => {
            core.logs
                .set_auto_refresh(enabled, core.config.logs_poll_interval());
            return None;
        }
        PanelCommand::SaveToken(token) => PanelEvent::TokenSaved(core.credentials.save(&token)),
        PanelCommand::PingServer => {
            let ping = core
                .client
                .health()
                .await
                .map(|h| format!("status={} ftg={}", h.status, h.ftg_status));
            PanelEvent::Ping(ping)
        }
        PanelCommand::LoadBot => PanelEvent::BotLoaded(core.bot.load().await),
        PanelCommand::SaveBot(form) => PanelEvent::BotSaved(core.bot.save(&form).await),
        PanelCommand::LoadLlm => PanelEvent::LlmLoaded(core.llm.load().await),
        PanelCommand::SaveLlm(form) => {
            let stored = core.llm.remember_api_key(&form);
            if let Err(e) = &stored {
                tracing::warn!(error = %e, "LLM API key not stored locally");
            }
            let saved = core.llm.save(&form).await.map_err(|e| e.to_string());
            PanelEvent::LlmSaved(saved.and(stored.map_err(|e| e.to_string())))
        }
        PanelCommand::LoadProviders { offer_default } => PanelEvent::Providers {
            result: core.llm.load_providers().await,
            offer_default,
        },
        PanelCommand::TestChat(prompt) => {
            PanelEvent::ChatReply(core.client.llm_chat(&prompt).await)
        }
        PanelCommand::SendMessage { chat, text } => {
            PanelEvent::MessageSent(core.client.send_message(&chat, &text).await)
        }
    };
    Some(event)
}
