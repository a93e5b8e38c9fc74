//! TOML-based configuration for the control daemon.
//!
//! Reads `AppConfig` from `/etc/beamcom/config.toml` (or the path given
//! with `--config`).  The file describes the listening socket and the
//! device table; when it is absent the daemon serves the deployed
//! beamline's standard table, so a bare `beamcom-server` invocation is
//! immediately useful.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format
//! designed to be easy to read and write.  It looks similar to INI files
//! but with more data types.  Example:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 3001
//!
//! [[devices]]
//! alias = "photonenergy"
//! speed = 10.0
//! writable = true
//! min = 240.0
//! max = 2000.0
//! ```
//!
//! The `serde` library provides automatic serialisation/deserialisation
//! between Rust structs and TOML text.  The `#[derive(Serialize,
//! Deserialize)]` macros generate all the boilerplate code at compile time.
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return
//! value of `some_fn()` when the field is absent from the TOML file.  An
//! operator therefore only writes the fields they want to change: a device
//! entry with just an `alias` line gets value 0.0, speed 10.0, read-only,
//! no limits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use beamcom_core::DeviceSpec;

/// Path the daemon reads when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/beamcom/config.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A device entry sets `min` without `max` or vice versa.
    #[error("device {alias:?} sets only one of min/max; soft limits need both")]
    IncompleteLimits { alias: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Listening socket settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Device table; replaces the whole default table when present.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceEntry>,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind the listener to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for the command channel.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// One device in the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    /// Alias the wire protocol addresses the device by.
    pub alias: String,
    /// Value the device rests at when the daemon starts.
    #[serde(default = "default_value")]
    pub value: f64,
    /// Travel speed in value units per second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Whether `set`/`send` may retarget this device.
    #[serde(default)]
    pub writable: bool,
    /// Lower soft limit on write values; requires `max` as well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper soft limit on write values; requires `min` as well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_value() -> f64 {
    0.0
}
fn default_speed() -> f64 {
    10.0
}

/// The deployed beamline's device table: eighteen devices, each at rest at
/// 0.0 and travelling at 10 units/s.  Four are operator-settable; the
/// photon energy is additionally bounded to the monochromator's working
/// range.
fn default_devices() -> Vec<DeviceEntry> {
    const ALIASES: [&str; 18] = [
        "photonenergy",
        "exitslit",
        "helicity",
        "mono",
        "undugap",
        "undufactor",
        "undushift",
        "ringcurrent",
        "keithley1",
        "keithley2",
        "slt2hleft",
        "slt2hright",
        "slt2vgap",
        "slt2voffset",
        "exsu2bpm",
        "exsu2baffle",
        "pressure",
        "screen",
    ];
    const WRITABLE: [&str; 4] = ["photonenergy", "exitslit", "undufactor", "screen"];

    ALIASES
        .iter()
        .map(|&alias| DeviceEntry {
            alias: alias.to_string(),
            value: default_value(),
            speed: default_speed(),
            writable: WRITABLE.contains(&alias),
            min: (alias == "photonenergy").then_some(240.0),
            max: (alias == "photonenergy").then_some(2000.0),
        })
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            devices: default_devices(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Converts the configured device entries into registry specs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IncompleteLimits`] when an entry sets `min`
    /// without `max` or vice versa.  Range ordering, finiteness, and alias
    /// uniqueness are checked by the registry at construction.
    pub fn device_specs(&self) -> Result<Vec<DeviceSpec>, ConfigError> {
        self.devices
            .iter()
            .map(|entry| {
                let mut spec = DeviceSpec::new(entry.alias.clone(), entry.value, entry.speed);
                if entry.writable {
                    spec = spec.writable();
                }
                match (entry.min, entry.max) {
                    (Some(min), Some(max)) => spec = spec.with_limits(min, max),
                    (None, None) => {}
                    (Some(_), None) | (None, Some(_)) => {
                        return Err(ConfigError::IncompleteLimits {
                            alias: entry.alias.clone(),
                        });
                    }
                }
                Ok(spec)
            })
            .collect()
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
