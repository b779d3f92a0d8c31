//! Touch Up agent entry point.
//!
//! Loads the config file, wires the coordinator to the platform and the
//! identity store, and runs until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()         -- settings + identity cue
//!  └─ MockPlatform::demo()       -- display list + touch driver
//!  └─ spawn_coordinator()        -- single-owner coordinator task
//!  └─ status pump                -- logs every status / completion change
//! ```
//!
//! # Usage
//!
//! ```text
//! touchup-agent [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Config file [env: TOUCHUP_CONFIG]
//!   --log-level <LEVEL>   Overrides `agent.log_level` [env: TOUCHUP_LOG_LEVEL]
//!   --simulate-taps       Feed four corner taps to the calibration session
//! ```
//!
//! `RUST_LOG` takes precedence over both the flag and the config file.
//!
//! # Platform
//!
//! The `MockPlatform` used here stands in for the window server's display
//! list and the HID touch driver.  A native build replaces it with adapters
//! that forward reconfiguration callbacks, USB arrivals and contact frames
//! as [`CoordinatorEvent`]s.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use touchup_agent::application::coordinator::{TouchDriver, TouchscreenCoordinator};
use touchup_agent::application::display_registry::DisplayEnumerator;
use touchup_agent::infrastructure::platform::mock::MockPlatform;
use touchup_agent::infrastructure::runtime::{spawn_coordinator, CoordinatorEvent};
use touchup_agent::infrastructure::storage::config::{config_file_path, load_config_from};
use touchup_agent::infrastructure::storage::identity::{IdentityStore, TomlIdentityStore};
use touchup_agent::infrastructure::ui_bridge::to_json;
use touchup_core::{NormalizedPoint, TouchPoint};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Touchscreen identity and calibration agent.
#[derive(Debug, Parser)]
#[command(
    name = "touchup-agent",
    about = "Keeps track of which display is the touchscreen and calibrates it",
    version
)]
struct Cli {
    /// Path of the TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "TOUCHUP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "TOUCHUP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Feed four corner taps to the calibration session after start-up.
    #[arg(long)]
    simulate_taps: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => config_file_path().context("no config path given and no platform config dir")?,
    };
    let config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.agent.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!(config = %config_path.display(), "Touch Up agent starting");

    // ── Platform ──────────────────────────────────────────────────────────────
    let platform = Arc::new(MockPlatform::demo());
    platform.apply_settings(&config.driver_settings());

    // ── Coordinator ───────────────────────────────────────────────────────────
    let coordinator = TouchscreenCoordinator::new(
        Arc::clone(&platform) as Arc<dyn DisplayEnumerator>,
        Arc::clone(&platform) as Arc<dyn TouchDriver>,
        config.identity_cue(),
        config.coordinator_settings(),
    );
    let store: Arc<dyn IdentityStore> = Arc::new(TomlIdentityStore::new(config_path));
    let (handle, task) = spawn_coordinator(coordinator, store);

    // ── Status pump ───────────────────────────────────────────────────────────
    let mut status_rx = handle.watch_status();
    let mut completions = handle.subscribe_completions();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = status_rx.borrow_and_update().clone();
                    match to_json(&status) {
                        Ok(json) => info!(target: "touchup::status", "{json}"),
                        Err(e) => warn!("failed to render status: {e}"),
                    }
                }
                done = completions.recv() => match done {
                    Ok(done) => info!(
                        display = %done.display,
                        calibrated = done.calibrated,
                        "calibration session ended"
                    ),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("missed {n} calibration notices");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    if cli.simulate_taps {
        for (x, y) in [(0.05, 0.05), (0.95, 0.05), (0.05, 0.95), (0.95, 0.95)] {
            let tap = vec![TouchPoint::began(0, NormalizedPoint::new(x, y))];
            handle.send(CoordinatorEvent::Touches(tap)).await?;
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
    }

    info!("Touch Up agent ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    drop(handle);
    task.await.context("coordinator task panicked")?;

    info!("Touch Up agent stopped");
    Ok(())
}
