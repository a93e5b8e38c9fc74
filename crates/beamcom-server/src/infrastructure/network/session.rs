//! Per-connection serving loop.
//!
//! One session owns one accepted socket.  Bytes are appended to a growing
//! receive buffer; every complete `eoc`-terminated frame is parsed,
//! dispatched, and answered with an `eoa`-terminated reply before the next
//! read.  A burst of pipelined commands in a single TCP segment is served
//! in order, one reply each.
//!
//! The loop is generic over the stream type so the whole command/reply
//! cycle can be unit-tested against `tokio_test::io` mocks; the listener
//! passes a real `TcpStream`.
//!
//! Reads are wrapped in a 200 ms timeout so the shutdown flag is observed
//! even while a client sits idle holding the connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use beamcom_core::{
    decode_request, encode_reply, find_frame, DeviceRegistry, FaultKind, Reply, COMMAND_SENTINEL,
};

use crate::application::dispatch::{self, DispatchOutcome};

/// Largest number of bytes the session will buffer while waiting for a
/// sentinel.  Commands are a few dozen bytes; a client that sends this much
/// without an `eoc` is not speaking the protocol and gets disconnected.
pub const MAX_COMMAND_BYTES: usize = 1024;

/// Why a session ended without an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `closeconnection` and was answered with `bye!`.
    ClosedByCommand,
    /// The client closed its end of the socket.
    Disconnected,
    /// The shutdown flag was cleared while the session was open.
    ShutdownRequested,
}

/// Errors that terminate a session abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The socket failed mid-session.
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The receive buffer filled up without a sentinel in sight.
    #[error("command exceeded {MAX_COMMAND_BYTES} bytes without a sentinel")]
    FrameTooLong,
}

/// Serves one connection until the client closes it, asks to close it, the
/// daemon shuts down, or the stream errors.
///
/// The registry is borrowed for the whole session: device state outlives
/// every connection, and the single-session service discipline means no
/// other reader exists while this runs.
pub async fn run_session<S>(
    stream: &mut S,
    registry: &mut DeviceRegistry,
    running: &AtomicBool,
) -> Result<SessionEnd, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    let mut served: u64 = 0;

    loop {
        // Serve every complete frame already in the buffer before reading
        // more, so a pipelined burst is answered in arrival order.
        loop {
            let (decoded, consumed) = match find_frame(&buf, COMMAND_SENTINEL) {
                Some(frame) => (decode_request(frame.payload), frame.consumed),
                None => break,
            };
            buf.drain(..consumed);
            served += 1;

            let outcome = match decoded {
                Ok(request) => {
                    debug!("command: {request}");
                    dispatch::execute(registry, &request, Instant::now())
                }
                Err(err) => {
                    warn!("unparseable command: {err}");
                    DispatchOutcome::reply(Reply::Fault(FaultKind::for_request_error(&err)))
                }
            };

            stream.write_all(encode_reply(&outcome.reply).as_bytes()).await?;
            if outcome.close_after_reply {
                stream.flush().await?;
                debug!("session served {served} command(s), closing on request");
                return Ok(SessionEnd::ClosedByCommand);
            }
        }

        if buf.len() >= MAX_COMMAND_BYTES {
            return Err(SessionError::FrameTooLong);
        }
        if !running.load(Ordering::Relaxed) {
            return Ok(SessionEnd::ShutdownRequested);
        }

        // Timed read: a timeout is only a tick to re-check the flag above.
        let mut chunk = [0u8; 1024];
        match timeout(Duration::from_millis(200), stream.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                if !buf.is_empty() {
                    debug!("client left {} unterminated byte(s) behind", buf.len());
                }
                return Ok(SessionEnd::Disconnected);
            }
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(e.into()),
            Err(_elapsed) => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
