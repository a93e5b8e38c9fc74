//! beamcom command-line client entry point.
//!
//! A thin shell-scriptable front end for the beamcom server: each
//! invocation opens a connection, runs one subcommand, says
//! `closeconnection`, and exits.  Measurement loops that need many
//! commands per second should embed [`beamcom_client::BeamClient`]
//! instead of shelling out per command, since the server serves one
//! connection at a time.
//!
//! # Usage
//!
//! ```text
//! beamcom-client [OPTIONS] <COMMAND>
//!
//! Commands:
//!   read   Read the current position of a device
//!   set    Move a device to a new setpoint
//!   check  Print 1 if the device has settled on its target, else 0
//!
//! Options:
//!   --host <HOST>  Server hostname or IP [default: 127.0.0.1]
//!   --port <PORT>  Server TCP port [default: 3001]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable       | Default     | Description            |
//! |----------------|-------------|------------------------|
//! | `BEAMCOM_HOST` | `127.0.0.1` | Server hostname or IP  |
//! | `BEAMCOM_PORT` | `3001`      | Server TCP port        |
//!
//! # Examples
//!
//! ```text
//! $ beamcom-client set photonenergy 650 --wait
//! done
//! $ beamcom-client read photonenergy
//! 650.0
//! $ beamcom-client check exitslit
//! 1
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use beamcom_client::BeamClient;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Command-line client for the beamcom control daemon.
#[derive(Debug, Parser)]
#[command(
    name = "beamcom-client",
    about = "Command-line client for the beamcom control daemon",
    version
)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "BEAMCOM_HOST")]
    host: String,

    /// Server TCP port.
    #[arg(long, default_value_t = 3001, env = "BEAMCOM_PORT")]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read the current position of a device.
    Read {
        /// Device alias, e.g. `photonenergy`.
        alias: String,
    },

    /// Move a device to a new setpoint.
    Set {
        /// Device alias, e.g. `exitslit`.
        alias: String,
        /// Target value in device units.
        value: f64,
        /// Block until the device reports in-position.
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds.
        #[arg(long, default_value_t = 120.0, requires = "wait")]
        timeout: f64,
    },

    /// Print 1 if the device has settled on its target, else 0.
    Check {
        /// Device alias, e.g. `undugap`.
        alias: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Resolves `host:port` to the first matching socket address.
async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}:{port}"))?;
    addrs
        .next()
        .with_context(|| format!("no addresses found for {host}:{port}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to `warn` so command output on stdout stays clean; set
    // RUST_LOG=debug to watch the wire traffic on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let addr = resolve(&cli.host, cli.port).await?;
    let mut client = BeamClient::connect(addr).await?;

    match cli.command {
        Command::Read { alias } => {
            let value = client.read_position(&alias).await?;
            // `{:?}` keeps the trailing `.0` on whole numbers, matching
            // what the server puts on the wire.
            println!("{value:?}");
        }

        Command::Set {
            alias,
            value,
            wait,
            timeout,
        } => {
            let deadline = Duration::try_from_secs_f64(timeout)
                .context("--timeout must be a non-negative number of seconds")?;
            client.write(&alias, value).await?;
            if wait {
                client
                    .wait_settled(&alias, Duration::from_millis(500), deadline)
                    .await?;
            }
            println!("done");
        }

        Command::Check { alias } => {
            let settled = client.in_position(&alias).await?;
            println!("{}", u8::from(settled));
        }
    }

    client.close().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_target_local_server() {
        let cli = Cli::parse_from(["beamcom-client", "read", "mono"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 3001);
    }

    #[test]
    fn test_cli_read_subcommand_parses_alias() {
        let cli = Cli::parse_from(["beamcom-client", "read", "photonenergy"]);
        match cli.command {
            Command::Read { alias } => assert_eq!(alias, "photonenergy"),
            other => panic!("expected Read, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_set_subcommand_parses_value() {
        let cli = Cli::parse_from(["beamcom-client", "set", "exitslit", "42.5"]);
        match cli.command {
            Command::Set {
                alias,
                value,
                wait,
                ..
            } => {
                assert_eq!(alias, "exitslit");
                assert_eq!(value, 42.5);
                assert!(!wait);
            }
            other => panic!("expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_set_wait_flag() {
        let cli = Cli::parse_from(["beamcom-client", "set", "exitslit", "42.5", "--wait"]);
        match cli.command {
            Command::Set { wait, timeout, .. } => {
                assert!(wait);
                assert_eq!(timeout, 120.0);
            }
            other => panic!("expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_timeout_requires_wait() {
        let result = Cli::try_parse_from([
            "beamcom-client",
            "set",
            "exitslit",
            "42.5",
            "--timeout",
            "10",
        ]);
        assert!(result.is_err(), "--timeout without --wait must be rejected");
    }

    #[test]
    fn test_cli_rejects_non_numeric_setpoint() {
        let result = Cli::try_parse_from(["beamcom-client", "set", "exitslit", "fast"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_host_and_port_overrides() {
        let cli = Cli::parse_from([
            "beamcom-client",
            "--host",
            "b181ctl",
            "--port",
            "4001",
            "check",
            "undugap",
        ]);
        assert_eq!(cli.host, "b181ctl");
        assert_eq!(cli.port, 4001);
    }

    #[tokio::test]
    async fn test_resolve_loopback() {
        let addr = resolve("127.0.0.1", 3001).await.expect("resolve");
        assert_eq!(addr.to_string(), "127.0.0.1:3001");
    }
}
