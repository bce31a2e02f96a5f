pub mod config;
pub mod input;
pub mod link;
pub mod scheduler;
pub mod snapshot;
pub mod ui;

use crate::config::PanelConfig;
use crate::input::{AggregatorHandle, GamepadHandle};
use crate::link::{LinkHandle, UpstreamEvent};
use crate::scheduler::{SchedulerHandle, SchedulerSettings};
use crate::ui::SimPanelUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = PanelConfig::load_or_default();
    info!("Starting simpanel with config: {:?}", config);

    let shutdown = CancellationToken::new();

    // Channels between the pipeline stages
    let (snapshot_tx, snapshot_rx) = mpsc::channel(1000);
    let (frame_tx, frame_rx) = mpsc::channel(100);
    let (notice_tx, notice_rx) = mpsc::channel(100);
    let (upstream_tx, upstream_rx) = mpsc::channel(100);
    let (edge_tx, edge_rx) = mpsc::channel(1000);

    info!("Spawning frame scheduler");
    let scheduler_settings = SchedulerSettings {
        min_interval_ms: config.render.min_interval_ms,
    };
    SchedulerHandle::spawn(
        snapshot_rx,
        frame_tx,
        Some(scheduler_settings),
        shutdown.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn scheduler: {}", e))?;

    info!("Spawning simulator link");
    LinkHandle::spawn(
        config.link.clone(),
        upstream_rx,
        snapshot_tx,
        notice_tx,
        shutdown.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn link: {}", e))?;

    info!("Spawning pad aggregator");
    let aggregator_handle = AggregatorHandle::spawn(edge_rx, edge_tx.clone(), upstream_tx.clone())
        .map_err(|e| eyre!("Failed to spawn aggregator: {}", e))?;

    // A gamepad is optional; the panel works with keyboard and pointer alone
    match GamepadHandle::spawn(aggregator_handle.edge_sender(), shutdown.clone()) {
        Ok(_) => info!("Gamepad collector running"),
        Err(e) => warn!("Continuing without gamepad input: {}", e),
    }

    // Ask for a first snapshot and announce the configured speed so the
    // panel is populated before the simulator clock ever runs
    upstream_tx
        .send(UpstreamEvent::RequestUpdate)
        .await
        .map_err(|e| eyre!("Upstream channel closed at startup: {}", e))?;
    upstream_tx
        .send(UpstreamEvent::Speed(
            config.speed.clamp(i64::from(config.speed.initial)),
        ))
        .await
        .map_err(|e| eyre!("Upstream channel closed at startup: {}", e))?;

    info!("Starting panel UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        egui::ViewportBuilder::default().with_inner_size(egui::vec2(1280.0, 800.0));

    let render_config = config.render.clone();
    let speed_config = config.speed.clone();
    let ui_result = eframe::run_native(
        "SimPanel",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(SimPanelUI::new(
                cc,
                frame_rx,
                notice_rx,
                edge_tx,
                upstream_tx,
                render_config,
                speed_config,
            )))
        }),
    );

    info!("UI closed, stopping background tasks");
    shutdown.cancel();

    ui_result.map_err(|e| eyre!("UI terminated abnormally: {}", e))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
