//! Published daemon state for the dashboard and log views.
//!
//! Each monitor owns one [`PollSlot`] and a `watch` channel; the UI reads the
//! latest snapshot and never writes it.

use crate::error::TransportError;
use crate::poller::{PollSlot, Poller};
use crate::protocol::{DaemonAction, HealthState};
use crate::transport::ControlClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSnapshot {
    pub health: HealthState,
    /// `running` from the last successful `status` call.
    pub running: bool,
    /// Message of the last failed refresh, cleared on success.
    pub last_error: Option<String>,
}

/// One refresh cycle: `/health` then an `/exec status` call.
pub async fn fetch_dashboard(
    client: &ControlClient,
) -> Result<(HealthState, bool), TransportError> {
    let health = client.health().await?;
    let status = client.exec(DaemonAction::Status, None).await?;
    Ok((health, status.running.unwrap_or(false)))
}

fn apply_dashboard(
    state: &watch::Sender<DashboardSnapshot>,
    result: &Result<(HealthState, bool), TransportError>,
) {
    state.send_modify(|snapshot| match result {
        Ok((health, running)) => {
            snapshot.health = health.clone();
            snapshot.running = *running;
            snapshot.last_error = None;
        }
        Err(e) => {
            snapshot.health = HealthState::error();
            snapshot.last_error = Some(e.to_string());
        }
    });
}

/// Owner of [`HealthState`] and the running flag.
pub struct DashboardMonitor {
    client: Arc<ControlClient>,
    state: Arc<watch::Sender<DashboardSnapshot>>,
    slot: PollSlot,
}

impl DashboardMonitor {
    pub fn new(client: Arc<ControlClient>) -> Self {
        let (tx, _rx) = watch::channel(DashboardSnapshot::default());
        Self {
            client,
            state: Arc::new(tx),
            slot: PollSlot::new("health"),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.borrow().clone()
    }

    pub fn running(&self) -> bool {
        self.state.borrow().running
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.state.send_modify(|s| s.running = running);
    }

    /// Refresh now, outside the poll cycle, and publish the result.
    pub async fn refresh(&self) -> Result<(), TransportError> {
        let result = fetch_dashboard(&self.client).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "dashboard refresh failed");
        }
        apply_dashboard(&self.state, &result);
        result.map(|_| ())
    }

    /// Start (or restart) the periodic refresh. The first refresh runs immediately.
    pub fn start_polling(&self, interval: Duration) {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let handle = Poller::start_immediate(
            interval,
            move || {
                let client = Arc::clone(&client);
                async move { fetch_dashboard(&client).await }
            },
            move |result| {
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "health poll failed");
                }
                apply_dashboard(&state, &result);
            },
        );
        self.slot.replace(handle);
        tracing::info!(interval_ms = interval.as_millis() as u64, "health polling started");
    }

    pub fn stop_polling(&self) {
        self.slot.stop();
    }

    /// Stop polling and wait for the loop task to finish.
    pub async fn shutdown(&self) {
        self.slot.shutdown().await;
    }

    pub fn is_polling(&self) -> bool {
        self.slot.is_active()
    }
}

/// Owner of the daemon log tail shown in the logs view.
pub struct LogMonitor {
    client: Arc<ControlClient>,
    lines: u32,
    state: Arc<watch::Sender<Vec<String>>>,
    slot: PollSlot,
}

fn apply_log_tail(state: &watch::Sender<Vec<String>>, result: Result<Vec<String>, TransportError>) {
    let lines = match result {
        Ok(lines) => lines,
        Err(e) => vec![format!("Error: {}", e)],
    };
    state.send_replace(lines);
}

impl LogMonitor {
    pub fn new(client: Arc<ControlClient>, lines: u32) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            client,
            lines,
            state: Arc::new(tx),
            slot: PollSlot::new("logs"),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.state.subscribe()
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.borrow().clone()
    }

    pub async fn refresh(&self) {
        let result = self.client.logs_tail(self.lines).await;
        apply_log_tail(&self.state, result);
    }

    /// Turn periodic refresh on or off. Turning it on replaces any running loop.
    pub fn set_auto_refresh(&self, enabled: bool, interval: Duration) {
        if !enabled {
            self.slot.stop();
            return;
        }
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let lines = self.lines;
        let handle = Poller::start_immediate(
            interval,
            move || {
                let client = Arc::clone(&client);
                async move { client.logs_tail(lines).await }
            },
            move |result| apply_log_tail(&state, result),
        );
        self.slot.replace(handle);
    }

    pub fn auto_refresh(&self) -> bool {
        self.slot.is_active()
    }

    pub async fn shutdown(&self) {
        self.slot.shutdown().await;
    }

    /// All lines joined for the clipboard.
    pub fn joined(&self) -> String {
        self.state.borrow().join("\n")
    }
}
