//! # beamcom-core
//!
//! Shared library for beamcom containing the wire protocol (command and
//! reply types plus the sentinel-framed text codec) and the device-kinematics
//! domain model.
//!
//! This crate is used by both the server daemon and the client tools.
//! It has zero dependencies on sockets, clocks beyond `std::time::Instant`
//! values passed in by callers, or configuration formats.
//!
//! # Architecture overview (for beginners)
//!
//! beamcom is a beamline-instrument control daemon: it exposes a set of named
//! "devices" (motors, slits, sensors) over a tiny line-oriented TCP protocol.
//! A control-system client sends `read photonenergy eoc` and gets back
//! `current position: 500.0 eoa`; it sends `set photonenergy 650 eoc` and the
//! device starts "moving" toward 650 at its configured speed.
//!
//! This crate (`beamcom-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the wire.  Requests are plain
//!   text terminated by the sentinel token `eoc`, replies by `eoa`.  The
//!   codec turns raw receive buffers into typed [`Request`] values and typed
//!   [`Reply`] values back into wire text.
//!
//! - **`domain`** – Pure simulation logic with no I/O.  A [`Device`] records
//!   a start value, a target value, a constant speed, and the instant the
//!   last move began; its current position is recomputed lazily from the
//!   clock on every query, so no background simulation thread exists
//!   anywhere.  The [`DeviceRegistry`] maps alias strings to devices and
//!   enforces the write policy (writability, soft limits).

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `beamcom_core::Request` instead of `beamcom_core::protocol::command::Request`.
pub use domain::device::Device;
pub use domain::registry::{DeviceError, DeviceRegistry, DeviceSpec, Limits, SpecError};
pub use protocol::codec::{
    decode_reply, decode_request, encode_reply, encode_request, find_frame, Frame, ProtocolError,
    COMMAND_SENTINEL, REPLY_SENTINEL,
};
pub use protocol::command::{Request, Verb};
pub use protocol::reply::{FaultKind, Reply};
