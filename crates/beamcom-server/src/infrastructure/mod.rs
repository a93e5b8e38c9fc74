//! Infrastructure layer for the control daemon.
//!
//! Contains OS-facing adapters: the TCP listener and per-connection session
//! loop, and the TOML configuration reader.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `beamcom_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod network;
pub mod storage;
