//! Desktop control panel for the FTG control server.
//!
//! Six tabs: dashboard (health and lifecycle actions), AI settings, logs, messages,
//! server connection and bot settings. Network work goes through the bridge; the
//! panel reads published dashboard and log state straight from the monitors.

mod bridge;

pub use bridge::{spawn_bridge, PanelCommand, PanelCore, PanelEvent, PanelReceiver, PanelSender};

use egui::{Color32, RichText, Ui};
use ftg_control::{
    AutoReplyMode, BotSettingsForm, DaemonAction, LlmProvider, LlmSettingsForm,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    AiSettings,
    Logs,
    Messages,
    Server,
    BotSettings,
}

impl Tab {
    const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::AiSettings,
        Tab::Logs,
        Tab::Messages,
        Tab::Server,
        Tab::BotSettings,
    ];

    fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::AiSettings => "AI Settings",
            Tab::Logs => "Logs",
            Tab::Messages => "Messages",
            Tab::Server => "Server",
            Tab::BotSettings => "Bot Settings",
        }
    }
}

pub struct ControlPanel {
    core: Arc<PanelCore>,
    sender: PanelSender,
    events: PanelReceiver,
    tab: Tab,

    action_status: Option<(bool, String)>,

    log_auto_refresh: bool,

    token_input: String,
    server_status: String,

    bot_form: BotSettingsForm,
    bot_status: String,

    llm_form: LlmSettingsForm,
    llm_status: String,
    providers: Vec<LlmProvider>,
    chat_prompt: String,
    chat_reply: String,

    message_chat: String,
    message_text: String,
    message_status: String,
}

impl ControlPanel {
    pub fn new(core: Arc<PanelCore>, sender: PanelSender, events: PanelReceiver) -> Self {
        let llm_form = core.llm.resource().initial_form();
        let panel = Self {
            core,
            sender,
            events,
            tab: Tab::Dashboard,
            action_status: None,
            log_auto_refresh: true,
            token_input: String::new(),
            server_status: String::new(),
            bot_form: BotSettingsForm::default(),
            bot_status: String::new(),
            llm_form,
            llm_status: String::new(),
            providers: Vec::new(),
            chat_prompt: "Say hello in one sentence.".to_string(),
            chat_reply: String::new(),
            message_chat: String::new(),
            message_text: String::new(),
            message_status: String::new(),
        };
        panel.send(PanelCommand::SetLogAutoRefresh(true));
        panel.send(PanelCommand::LoadBot);
        panel.send(PanelCommand::LoadLlm);
        // The loaded config decides the base URL at start-up.
        panel.send(PanelCommand::LoadProviders { offer_default: false });
        panel
    }

    fn send(&self, cmd: PanelCommand) {
        if let Err(e) = self.sender.try_send(cmd) {
            tracing::warn!(error = %e, "panel command dropped");
        }
    }

    /// Apply finished background work. Call once per frame before drawing.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::ActionFinished(Ok(outcome)) => {
                self.action_status = Some((outcome.ok, outcome.message));
            }
            PanelEvent::ActionFinished(Err(rejected)) => {
                self.action_status = Some((false, rejected.to_string()));
            }
            PanelEvent::TokenSaved(Ok(())) => {
                self.token_input.clear();
                self.server_status = "Token saved".to_string();
            }
            PanelEvent::TokenSaved(Err(e)) => {
                self.server_status = format!("Token active for this session; {}", e);
            }
            PanelEvent::Ping(Ok(summary)) => self.server_status = format!("Ping OK: {}", summary),
            PanelEvent::Ping(Err(e)) => self.server_status = format!("Ping failed: {}", e),
            PanelEvent::BotLoaded(Ok(form)) => {
                self.bot_form = form;
                self.bot_status = "Loaded".to_string();
            }
            PanelEvent::BotLoaded(Err(e)) | PanelEvent::BotSaved(Err(e)) => {
                self.bot_status = e.to_string();
            }
            PanelEvent::BotSaved(Ok(())) => self.bot_status = "Saved".to_string(),
            PanelEvent::LlmLoaded(Ok(form)) => {
                self.llm_form = form;
                self.llm_status = "Loaded".to_string();
            }
            PanelEvent::LlmLoaded(Err(e)) => self.llm_status = e.to_string(),
            PanelEvent::LlmSaved(Ok(())) => self.llm_status = "Saved".to_string(),
            PanelEvent::LlmSaved(Err(e)) => self.llm_status = e,
            PanelEvent::Providers { result: Ok(providers), offer_default } => {
                if offer_default && self.llm_form.offer_default_provider(&providers) {
                    self.llm_status = format!("Base URL set to {}", self.llm_form.base_url);
                }
                self.providers = providers;
            }
            PanelEvent::Providers { result: Err(e), .. } => self.llm_status = e.to_string(),
            PanelEvent::ChatReply(Ok(body)) => self.chat_reply = body,
            PanelEvent::ChatReply(Err(e)) => self.chat_reply = format!("Error: {}", e),
            PanelEvent::MessageSent(Ok(body)) => self.message_status = body,
            PanelEvent::MessageSent(Err(e)) => self.message_status = format!("Error: {}", e),
        }
    }

    /// Renders the panel (egui immediate mode). Call each frame from the eframe app.
    pub fn ui(&mut self, ui: &mut Ui) {
        self.drain_events();

        ui.heading(RichText::new("FTG Control").color(Color32::from_rgb(100, 180, 255)));
        ui.horizontal(|ui| {
            for tab in Tab::ALL {
                ui.selectable_value(&mut self.tab, tab, tab.label());
            }
        });
        ui.separator();

        match self.tab {
            Tab::Dashboard => self.dashboard_ui(ui),
            Tab::AiSettings => self.ai_settings_ui(ui),
            Tab::Logs => self.logs_ui(ui),
            Tab::Messages => self.messages_ui(ui),
            Tab::Server => self.server_ui(ui),
            Tab::BotSettings => self.bot_settings_ui(ui),
        }
    }

    fn dashboard_ui(&mut self, ui: &mut Ui) {
        let snapshot = self.core.dashboard.snapshot();
        let healthy = snapshot.health.status == "ok";
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Server:");
                let color = if healthy { Color32::LIGHT_GREEN } else { Color32::LIGHT_RED };
                ui.label(RichText::new(&snapshot.health.status).color(color));
            });
            ui.horizontal(|ui| {
                ui.label("FTG:");
                ui.label(snapshot.health.ftg_status.as_str());
            });
            ui.horizontal(|ui| {
                ui.label("Running:");
                ui.label(if snapshot.running { "yes" } else { "no" });
            });
            if let Some(err) = &snapshot.last_error {
                ui.label(RichText::new(err).small().color(Color32::GRAY));
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Refresh").clicked() {
                self.send(PanelCommand::RefreshDashboard);
            }
            for action in DaemonAction::ALL {
                let enabled = self.core.actions.can_dispatch(action).is_ok();
                let label = capitalize(action.as_str());
                if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                    self.send(PanelCommand::Action(action));
                }
            }
            if self.core.actions.is_pending() {
                ui.spinner();
            }
        });

        if let Some((ok, message)) = &self.action_status {
            let color = if *ok { Color32::LIGHT_GREEN } else { Color32::LIGHT_RED };
            ui.label(RichText::new(message).color(color));
        }
    }

    fn logs_ui(&mut self, ui: &mut Ui) {
        let mut auto_refresh = self.log_auto_refresh;
        ui.horizontal(|ui| {
            if ui.button("Refresh").clicked() {
                self.send(PanelCommand::RefreshLogs);
            }
            if ui.checkbox(&mut auto_refresh, "Auto-refresh").changed() {
                self.send(PanelCommand::SetLogAutoRefresh(auto_refresh));
            }
            if ui.button("Copy").clicked() {
                ui.ctx().copy_text(self.core.logs.joined());
            }
        });
        self.log_auto_refresh = auto_refresh;
        ui.separator();
        let lines = self.core.logs.lines();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(RichText::new(line).monospace());
                }
            });
    }

    fn messages_ui(&mut self, ui: &mut Ui) {
        egui::Grid::new("message_form").num_columns(2).show(ui, |ui| {
            ui.label("Chat");
            ui.text_edit_singleline(&mut self.message_chat);
            ui.end_row();
            ui.label("Text");
            ui.text_edit_multiline(&mut self.message_text);
            ui.end_row();
        });
        let ready = !self.message_chat.trim().is_empty() && !self.message_text.trim().is_empty();
        if ui.add_enabled(ready, egui::Button::new("Send")).clicked() {
            self.send(PanelCommand::SendMessage {
                chat: self.message_chat.trim().to_string(),
                text: self.message_text.clone(),
            });
        }
        if !self.message_status.is_empty() {
            ui.label(RichText::new(&self.message_status).monospace());
        }
    }

    fn server_ui(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label("Base URL:");
            ui.label(RichText::new(self.core.client.base_url()).monospace());
        });
        ui.horizontal(|ui| {
            ui.label("Control token:");
            ui.add(egui::TextEdit::singleline(&mut self.token_input).password(true));
        });
        ui.horizontal(|ui| {
            let has_token = !self.token_input.trim().is_empty();
            if ui.add_enabled(has_token, egui::Button::new("Save token")).clicked() {
                self.send(PanelCommand::SaveToken(self.token_input.clone()));
            }
            if ui.button("Ping").clicked() {
                self.send(PanelCommand::PingServer);
            }
        });
        if !self.server_status.is_empty() {
            ui.label(self.server_status.as_str());
        }
    }

    fn bot_settings_ui(&mut self, ui: &mut Ui) {
        let form = &mut self.bot_form;
        ui.checkbox(&mut form.auto_reply_enabled, "Auto-reply enabled");
        egui::ComboBox::from_label("Auto-reply mode")
            .selected_text(form.auto_reply_mode.label())
            .show_ui(ui, |ui| {
                for mode in AutoReplyMode::ALL {
                    ui.selectable_value(&mut form.auto_reply_mode, mode, mode.label());
                }
            });
        ui.checkbox(&mut form.silent_reading, "Silent reading (do not mark as read)");
        egui::Grid::new("bot_form").num_columns(2).show(ui, |ui| {
            ui.label("Allowlist (comma separated)");
            ui.text_edit_singleline(&mut form.allowlist);
            ui.end_row();
            ui.label("Blocklist (comma separated)");
            ui.text_edit_singleline(&mut form.blocklist);
            ui.end_row();
            ui.label("Min reply interval (s)");
            ui.text_edit_singleline(&mut form.min_reply_interval);
            ui.end_row();
            ui.label("Reply prompt");
            ui.text_edit_multiline(&mut form.reply_prompt);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Load").clicked() {
                self.send(PanelCommand::LoadBot);
            }
            if ui.button("Save").clicked() {
                self.send(PanelCommand::SaveBot(self.bot_form.clone()));
            }
            ui.label(self.bot_status.as_str());
        });
    }

    fn ai_settings_ui(&mut self, ui: &mut Ui) {
        let mut chosen = None;
        ui.horizontal(|ui| {
            ui.label("Provider:");
            for provider in &self.providers {
                if ui.button(provider.name.as_str()).clicked() {
                    chosen = Some(provider.base_url.clone());
                }
            }
            if ui.small_button("Reload providers").clicked() {
                self.send(PanelCommand::LoadProviders { offer_default: true });
            }
        });
        if let Some(base_url) = chosen {
            self.llm_form.base_url = base_url;
        }
        egui::Grid::new("llm_form").num_columns(2).show(ui, |ui| {
            ui.label("Base URL");
            ui.text_edit_singleline(&mut self.llm_form.base_url);
            ui.end_row();
            ui.label("Model");
            ui.text_edit_singleline(&mut self.llm_form.model);
            ui.end_row();
            ui.label("API key");
            ui.add(egui::TextEdit::singleline(&mut self.llm_form.api_key).password(true));
            ui.end_row();
            ui.label("Timeout (s)");
            ui.text_edit_singleline(&mut self.llm_form.request_timeout);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Load").clicked() {
                self.send(PanelCommand::LoadLlm);
            }
            if ui.button("Apply").clicked() {
                self.send(PanelCommand::SaveLlm(self.llm_form.clone()));
            }
            ui.label(self.llm_status.as_str());
        });

        ui.separator();
        ui.label("Test prompt");
        ui.text_edit_multiline(&mut self.chat_prompt);
        if ui.button("Send test").clicked() {
            self.chat_reply.clear();
            self.send(PanelCommand::TestChat(self.chat_prompt.clone()));
        }
        if !self.chat_reply.is_empty() {
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                ui.label(RichText::new(&self.chat_reply).monospace());
            });
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_buttons_are_capitalized() {
        let labels: Vec<String> = DaemonAction::ALL
            .iter()
            .map(|a| capitalize(a.as_str()))
            .collect();
        assert_eq!(labels, vec!["Start", "Stop", "Restart", "Status"]);
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn command_names_hide_values() {
        let cmd = PanelCommand::SaveToken("secret-token".to_string());
        assert_eq!(cmd.name(), "save_token");
        assert!(!cmd.name().contains("secret"));
    }

    #[test]
    fn tabs_in_display_order() {
        let labels: Vec<&str> = Tab::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(
            labels,
            vec!["Dashboard", "AI Settings", "Logs", "Messages", "Server", "Bot Settings"]
        );
    }
}
