//! Command dispatch: one parsed request in, exactly one reply out.
//!
//! The session loop parses frames off the socket and hands each
//! [`Request`] to [`execute`] together with the wall-clock instant it was
//! received.  Dispatch is where the one-reply-per-command guarantee lives:
//! unknown aliases, writes to read-only sensors, and out-of-range setpoints
//! all produce a reply the client can react to.  A control-system script
//! blocked in a read on its side of the socket must never be left hanging
//! because it asked about a device we do not have.
//!
//! Passing `now` in as a parameter (rather than calling `Instant::now()`
//! here) keeps this layer deterministic: tests pick the instants and get
//! bit-exact positions back.

use std::time::Instant;

use tracing::{info, warn};

use beamcom_core::{DeviceError, DeviceRegistry, FaultKind, Reply, Request};

/// What the session loop must do after executing one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchOutcome {
    /// Reply to encode and send back on the same connection.
    pub reply: Reply,
    /// When `true` the session flushes the reply and closes the socket.
    pub close_after_reply: bool,
}

impl DispatchOutcome {
    /// Outcome that keeps the session open.
    pub fn reply(reply: Reply) -> Self {
        Self {
            reply,
            close_after_reply: false,
        }
    }

    /// Outcome that closes the session once the reply is flushed.
    pub fn close(reply: Reply) -> Self {
        Self {
            reply,
            close_after_reply: true,
        }
    }
}

/// Executes `request` against `registry` at wall-clock instant `now`.
///
/// The match is exhaustive over [`Request`], so adding a new command to the
/// protocol without deciding its reply here is a compile error.  Registry
/// refusals are mapped to replies by [`refusal`]; nothing in this path
/// panics or stays silent.
pub fn execute(
    registry: &mut DeviceRegistry,
    request: &Request,
    now: Instant,
) -> DispatchOutcome {
    match request {
        Request::Read { alias } => match registry.position(alias, now) {
            Ok(value) => DispatchOutcome::reply(Reply::Position(value)),
            Err(e) => refusal(&e),
        },

        Request::Check { alias } => match registry.in_position(alias, now) {
            Ok(settled) => DispatchOutcome::reply(Reply::InPosition(settled)),
            Err(e) => refusal(&e),
        },

        Request::Write { alias, value } => match registry.write(alias, *value, now) {
            Ok(()) => {
                // The device is guaranteed to exist after a successful write.
                if let Some(device) = registry.device(alias) {
                    info!(
                        "{alias} moving to {value:?} (settles in {:.1} s)",
                        device.settle_time_secs()
                    );
                }
                DispatchOutcome::reply(Reply::Done)
            }
            Err(e) => refusal(&e),
        },

        Request::Close => DispatchOutcome::close(Reply::Bye),
    }
}

/// Maps a registry refusal onto its wire reply.
///
/// Out-of-range keeps its dedicated `out-of-range` payload; the other
/// refusals use `error:` replies so a client can tell a typo'd alias from a
/// rejected setpoint.
fn refusal(error: &DeviceError) -> DispatchOutcome {
    warn!("command refused: {error}");
    let reply = match error {
        DeviceError::UnknownAlias(_) => Reply::Fault(FaultKind::UnknownAlias),
        DeviceError::ReadOnly(_) => Reply::Fault(FaultKind::ReadOnly),
        DeviceError::OutOfRange { .. } => Reply::OutOfRange,
    };
    DispatchOutcome::reply(reply)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
