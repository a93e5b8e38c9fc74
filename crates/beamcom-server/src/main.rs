//! beamcom server daemon entry point.
//!
//! This binary simulates a synchrotron beamline endstation: a table of
//! named devices (monochromator, undulator, slits, sensors) that move
//! toward their setpoints at configured speeds and are addressed over a
//! small line-oriented TCP protocol.  It exists so control-system software
//! can be developed and soak-tested without beamtime.
//!
//! # Usage
//!
//! ```text
//! beamcom-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>  TOML config file [default: /etc/beamcom/config.toml]
//!   --port   <PORT>  Override the listen port from the config file
//!   --bind   <ADDR>  Override the bind address from the config file
//! ```
//!
//! # Environment variable overrides
//!
//! The CLI defaults can also be overridden with environment variables.
//! CLI args take precedence when both are present.
//!
//! | Variable         | Default                    | Description        |
//! |------------------|----------------------------|--------------------|
//! | `BEAMCOM_CONFIG` | `/etc/beamcom/config.toml` | Config file path   |
//! | `BEAMCOM_PORT`   | from config (3001)         | Listen port        |
//! | `BEAMCOM_BIND`   | from config (0.0.0.0)      | Bind address       |
//!
//! # Architecture overview
//!
//! ```text
//! control-system client  (plain text over TCP, `eoc`/`eoa` sentinels)
//!       ↕
//! beamcom-server  ← this process
//!   application/     dispatch: one request in, one reply out
//!   infrastructure/
//!     network/       accept loop (one client at a time), session loop
//!     storage/       TOML device table
//!       ↕
//! beamcom-core     request/reply codec, device kinematics
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beamcom_core::DeviceRegistry;
use beamcom_server::infrastructure::network::ComServer;
use beamcom_server::infrastructure::storage::config::{
    load_config, AppConfig, DEFAULT_CONFIG_PATH,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Beamline instrument control daemon.
///
/// Serves a configurable table of simulated devices over the `eoc`/`eoa`
/// sentinel protocol, one client connection at a time.
#[derive(Debug, Parser)]
#[command(
    name = "beamcom-server",
    about = "Beamline instrument control daemon",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// When the file does not exist the daemon serves the deployed
    /// beamline's standard eighteen-device table.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "BEAMCOM_CONFIG")]
    config: PathBuf,

    /// Override the listen port from the config file.
    #[arg(long, env = "BEAMCOM_PORT")]
    port: Option<u16>,

    /// Override the bind address from the config file.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` to accept only local connections.
    #[arg(long, env = "BEAMCOM_BIND")]
    bind: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file exists but cannot be read or
    /// parsed.
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; the log level is controlled by
///    the `RUST_LOG` environment variable (e.g., `RUST_LOG=debug`).
/// 2. CLI arguments are parsed with `clap` and merged over the TOML config.
/// 3. The device table is validated and turned into a [`DeviceRegistry`].
/// 4. A Ctrl+C handler is spawned; it clears a shared `AtomicBool`.
/// 5. The listener binds and serves clients until the flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `EnvFilter::try_from_default_env()` reads the `RUST_LOG` environment
    // variable.  If it is absent or invalid, fall back to `info` level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.into_config()?;

    info!(
        "beamcom server starting (config {}, listen {}:{})",
        config_path.display(),
        config.server.bind_address,
        config.server.port
    );

    // One registry for the life of the process: device positions survive
    // across client connections and are lost only on exit.
    let registry = DeviceRegistry::from_specs(config.device_specs()?, Instant::now())
        .context("invalid device table")?;

    // Graceful shutdown flag, cleared by Ctrl+C (SIGINT).  The accept and
    // session loops poll it every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let server = ComServer::bind(&config.server.bind_address, config.server.port).await?;
    server.serve(registry, running).await?;

    info!("beamcom server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
