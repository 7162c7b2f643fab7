//! Lifecycle action coordinator.
//!
//! One action slot per screen: `Idle -> Pending -> (Succeeded | Failed) -> Idle`.
//! The slot itself rejects overlapping dispatches, so the guarantee does not
//! depend on the UI disabling its buttons.

use crate::error::ActionRejected;
use crate::monitor::DashboardMonitor;
use crate::protocol::DaemonAction;
use crate::transport::ControlClient;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Pending(DaemonAction),
    Succeeded(DaemonAction),
    Failed(DaemonAction),
}

/// Result of the most recent dispatched action, shown as a transient status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: DaemonAction,
    pub ok: bool,
    pub message: String,
}

struct Slot {
    state: SlotState,
    last_outcome: Option<ActionOutcome>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Frees the slot when dropped, including when the dispatching future is cancelled.
struct PendingGuard<'a> {
    slot: &'a Mutex<Slot>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.slot).state = SlotState::Idle;
    }
}

pub struct ActionCoordinator {
    client: Arc<ControlClient>,
    monitor: Arc<DashboardMonitor>,
    slot: Mutex<Slot>,
}

impl ActionCoordinator {
    pub fn new(client: Arc<ControlClient>, monitor: Arc<DashboardMonitor>) -> Self {
        Self {
            client,
            monitor,
            slot: Mutex::new(Slot {
                state: SlotState::Idle,
                last_outcome: None,
            }),
        }
    }

    pub fn state(&self) -> SlotState {
        lock(&self.slot).state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state(), SlotState::Pending(_))
    }

    pub fn last_outcome(&self) -> Option<ActionOutcome> {
        lock(&self.slot).last_outcome.clone()
    }

    /// Whether `action` would be accepted right now (drives button enabling).
    pub fn can_dispatch(&self, action: DaemonAction) -> Result<(), ActionRejected> {
        let slot = lock(&self.slot);
        self.check(&slot, action)
    }

    fn check(&self, slot: &Slot, action: DaemonAction) -> Result<(), ActionRejected> {
        if matches!(slot.state, SlotState::Pending(_)) {
            return Err(ActionRejected::Busy);
        }
        let running = self.monitor.running();
        match action {
            DaemonAction::Start if running => Err(ActionRejected::AlreadyRunning),
            DaemonAction::Stop if !running => Err(ActionRejected::NotRunning),
            _ => Ok(()),
        }
    }

    /// Send `action` to the daemon. On success the dashboard state is refreshed
    /// before this returns.
    pub async fn dispatch(&self, action: DaemonAction) -> Result<ActionOutcome, ActionRejected> {
        {
            let mut slot = lock(&self.slot);
            if let Err(rejected) = self.check(&slot, action) {
                tracing::debug!(%action, reason = %rejected, "action rejected");
                return Err(rejected);
            }
            slot.state = SlotState::Pending(action);
        }
        let _guard = PendingGuard { slot: &self.slot };
        tracing::info!(%action, "dispatching action");

        let outcome = match self.client.exec(action, None).await {
            Ok(res) => {
                if action == DaemonAction::Status && res.ok != Some(false) {
                    if let Some(running) = res.running {
                        self.monitor.set_running(running);
                    }
                }
                match res.ok {
                    Some(true) => ActionOutcome {
                        action,
                        ok: true,
                        message: format!("Action {} OK", action),
                    },
                    Some(false) => ActionOutcome {
                        action,
                        ok: false,
                        message: res.error.unwrap_or_else(|| "Action failed".to_string()),
                    },
                    // Accepted without an explicit verdict.
                    None => ActionOutcome {
                        action,
                        ok: true,
                        message: format!("Action {} sent", action),
                    },
                }
            }
            Err(e) => {
                tracing::warn!(%action, error = %e, "action failed");
                ActionOutcome {
                    action,
                    ok: false,
                    message: format!("Action {} error: {}", action, e),
                }
            }
        };

        if outcome.ok {
            // Failure here is already published as the error health state.
            let _ = self.monitor.refresh().await;
        }

        let mut slot = lock(&self.slot);
        slot.state = if outcome.ok {
            SlotState::Succeeded(action)
        } else {
            SlotState::Failed(action)
        };
        slot.last_outcome = Some(outcome.clone());
        tracing::info!(%action, ok = outcome.ok, message = %outcome.message, "action finished");
        Ok(outcome)
    }
}
