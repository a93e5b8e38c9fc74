//! Typed server replies for the beamcom wire protocol.
//!
//! Every received frame produces exactly one reply.  The reply payload
//! shapes are fixed by the upstream control layer, which string-matches
//! them (`done`, `bye!`, the `current position:` prefix), so their spelling
//! is part of the wire contract and must not drift.

use std::fmt;

use super::codec::ProtocolError;

/// Prefix of the `read` reply payload.  The upstream client splits on the
/// colon and parses the remainder as a float.
pub const POSITION_PREFIX: &str = "current position:";

/// Reasons a request can be refused without touching any device.
///
/// Encoded on the wire as `error:<reason> eoa`.  The reference server
/// silently dropped the reply for these cases, which could deadlock a
/// synchronous client; replying explicitly is the documented fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The alias is not in the device registry.
    UnknownAlias,
    /// The alias exists but does not accept writes.
    ReadOnly,
    /// The frame could not be parsed (missing alias/value, bad number, ...).
    MalformedCommand,
    /// The first token is not one of the recognized verbs.
    UnknownCommand,
}

impl FaultKind {
    /// Returns the wire spelling of the fault reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::UnknownAlias => "unknown-alias",
            FaultKind::ReadOnly => "read-only",
            FaultKind::MalformedCommand => "malformed-command",
            FaultKind::UnknownCommand => "unknown-command",
        }
    }

    /// Looks up a fault reason by its wire spelling (client side).
    pub fn from_reason(reason: &str) -> Option<Self> {
        match reason {
            "unknown-alias" => Some(FaultKind::UnknownAlias),
            "read-only" => Some(FaultKind::ReadOnly),
            "malformed-command" => Some(FaultKind::MalformedCommand),
            "unknown-command" => Some(FaultKind::UnknownCommand),
            _ => None,
        }
    }

    /// Maps a request parse failure onto the fault reply the session sends.
    ///
    /// An unrecognized verb gets its own reason (the deployed variant
    /// answered `unknown command` for those); every other parse failure is
    /// a malformed command.
    pub fn for_request_error(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownVerb(_) => FaultKind::UnknownCommand,
            _ => FaultKind::MalformedCommand,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server reply, one per received frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// `current position: <float>` – answer to `read`.
    Position(f64),
    /// `done` – a write was accepted and the move has started.
    Done,
    /// `1` (settled) or `0` (still moving) – answer to `check`.
    InPosition(bool),
    /// `bye!` – answer to `closeconnection`, sent just before close.
    Bye,
    /// `out-of-range` – the write value is outside the device's soft limits.
    OutOfRange,
    /// `error:<reason>` – the request was refused, see [`FaultKind`].
    Fault(FaultKind),
}

impl fmt::Display for Reply {
    /// Formats the reply payload as it appears on the wire, without the
    /// trailing sentinel.  Positions are rendered with a fractional part
    /// (`500.0`, not `500`), matching what the upstream float parser has
    /// always been fed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Position(value) => write!(f, "{POSITION_PREFIX} {value:?}"),
            Reply::Done => f.write_str("done"),
            Reply::InPosition(true) => f.write_str("1"),
            Reply::InPosition(false) => f.write_str("0"),
            Reply::Bye => f.write_str("bye!"),
            Reply::OutOfRange => f.write_str("out-of-range"),
            Reply::Fault(kind) => write!(f, "error:{kind}"),
        }
    }
}
