//! Storage infrastructure: configuration file reading.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML device table and listener settings from disk
//!   (`/etc/beamcom/config.toml` unless overridden on the command line).
//! - Providing the deployed default table when the file does not exist yet,
//!   so a bare `beamcom-server` invocation serves the standard beamline.
//! - Converting config entries into validated `DeviceSpec` values for the
//!   registry.

pub mod config;
