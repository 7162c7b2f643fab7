//! ftg-control-panel: egui desktop panel for the local FTG control server.
//!
//! The window runs on the main thread; all requests go through a tokio runtime via
//! the bridge in [`control_panel`].

pub mod control_panel;

pub use control_panel::{spawn_bridge, ControlPanel, PanelCommand, PanelCore, PanelEvent, Tab};
