//! beamcom-client library entry point.
//!
//! Re-exports the connection module so that the binary in `main.rs` and
//! any measurement script embedding this crate share the same API.

pub mod connection;

pub use connection::{BeamClient, ClientError};
