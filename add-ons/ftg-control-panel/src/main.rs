//! FTG Control Panel: desktop window for the local control server.
//!
//! Run with: cargo run -p ftg-control-panel
//! Configuration comes from `FTG_CONTROL_CONFIG` / `FTG_CONTROL__*` (see ftg-control).

use eframe::egui;
use ftg_control::ClientConfig;
use ftg_control_panel::{spawn_bridge, ControlPanel, PanelCore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[ftg-control-panel] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::load()?;
    tracing::info!(base_url = %config.base_url, "FTG control panel starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let _enter = runtime.enter();

    let core = Arc::new(PanelCore::new(config));
    core.dashboard.start_polling(core.config.health_poll_interval());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([560.0, 640.0])
            .with_title("FTG Control"),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    let app_core = Arc::clone(&core);
    let result = eframe::run_native(
        "FTG Control",
        options,
        Box::new(move |cc| {
            let (sender, events) =
                spawn_bridge(&handle, Arc::clone(&app_core), cc.egui_ctx.clone(), 64);
            Ok(Box::new(ControlPanelApp::new(ControlPanel::new(app_core, sender, events))))
        }),
    );

    runtime.block_on(async {
        core.dashboard.shutdown().await;
        core.logs.shutdown().await;
    });
    tracing::info!("FTG control panel stopped");
    result?;
    Ok(())
}

struct ControlPanelApp {
    panel: ControlPanel,
}

impl ControlPanelApp {
    fn new(panel: ControlPanel) -> Self {
        Self { panel }
    }
}

impl eframe::App for ControlPanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.panel.ui(ui);
        });
    }
}
