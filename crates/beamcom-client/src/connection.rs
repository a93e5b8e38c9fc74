//! TCP connection to a beamcom server.
//!
//! [`BeamClient`] owns one socket and speaks the protocol strictly
//! half-duplex: send one `eoc`-terminated command, read one
//! `eoa`-terminated reply, repeat.  The wire format has no separator
//! between replies, so pipelining requests would make the reply stream
//! unframeable; nothing here ever has more than one request in flight.
//!
//! Replies that the server uses to refuse a command (`error:…`,
//! `out-of-range`) surface as typed [`ClientError`] values from the
//! convenience methods, so a measurement loop can distinguish "the slit
//! is still moving" from "I typo'd the alias".

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};
use tracing::debug;

use beamcom_core::{
    decode_reply, encode_request, find_frame, FaultKind, ProtocolError, Reply, Request,
    REPLY_SENTINEL,
};

/// Largest reply the client will buffer while waiting for a sentinel.
/// Mirrors the server's command cap; real replies are under fifty bytes.
const MAX_REPLY_BYTES: usize = 1024;

/// Errors that can occur while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection while a reply was due.
    #[error("server closed the connection before replying")]
    Closed,

    /// The reply text could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The reply grew past [`MAX_REPLY_BYTES`] without a sentinel.
    #[error("reply exceeded {MAX_REPLY_BYTES} bytes without a sentinel")]
    ReplyTooLong,

    /// The server refused the command with an `error:` reply.
    #[error("server refused the command: {0}")]
    Refused(FaultKind),

    /// A write was rejected because the setpoint is outside the device's
    /// soft limits.
    #[error("setpoint rejected: outside the device's soft limits")]
    OutOfRange,

    /// The server answered with a reply that does not fit the command.
    #[error("unexpected reply (expected {expected}): {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: Reply,
    },

    /// A device did not report in-position within the caller's deadline.
    #[error("device {alias:?} did not settle within the deadline")]
    SettleTimeout { alias: String },
}

/// One connection to a beamcom server.
pub struct BeamClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl BeamClient {
    /// Connects to the server at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectFailed`] when the TCP connection is
    /// refused or times out at the OS level.  The server serves one client
    /// at a time, so a refusal usually means another session is active.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::ConnectFailed { addr, source })?;
        debug!("connected to {addr}");
        Ok(Self {
            stream,
            buf: Vec::with_capacity(256),
        })
    }

    /// Sends one request and returns the decoded reply, whatever it is.
    ///
    /// Refusal replies come back as `Ok(Reply::Fault(..))` here; the typed
    /// convenience methods below turn them into errors.
    ///
    /// # Errors
    ///
    /// I/O failures, a connection closed mid-reply, or reply text that
    /// does not decode.
    pub async fn query(&mut self, request: &Request) -> Result<Reply, ClientError> {
        let wire = encode_request(request);
        self.stream.write_all(wire.as_bytes()).await?;
        debug!("sent: {request}");

        loop {
            let (decoded, consumed) = match find_frame(&self.buf, REPLY_SENTINEL) {
                Some(frame) => (decode_reply(frame.payload), frame.consumed),
                None => {
                    if self.buf.len() >= MAX_REPLY_BYTES {
                        return Err(ClientError::ReplyTooLong);
                    }
                    let mut chunk = [0u8; 256];
                    let n = self.stream.read(&mut chunk).await?;
                    if n == 0 {
                        return Err(ClientError::Closed);
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                    continue;
                }
            };
            self.buf.drain(..consumed);
            let reply = decoded?;
            debug!("received: {reply}");
            return Ok(reply);
        }
    }

    /// Reads the interpolated position of `alias`.
    pub async fn read_position(&mut self, alias: &str) -> Result<f64, ClientError> {
        let request = Request::Read {
            alias: alias.to_string(),
        };
        match self.query(&request).await? {
            Reply::Position(value) => Ok(value),
            Reply::Fault(kind) => Err(ClientError::Refused(kind)),
            other => Err(ClientError::UnexpectedReply {
                expected: "current position",
                got: other,
            }),
        }
    }

    /// Moves `alias` toward `value`.  Returns as soon as the server
    /// acknowledges; the device then travels at its own speed.
    pub async fn write(&mut self, alias: &str, value: f64) -> Result<(), ClientError> {
        let request = Request::Write {
            alias: alias.to_string(),
            value,
        };
        match self.query(&request).await? {
            Reply::Done => Ok(()),
            Reply::OutOfRange => Err(ClientError::OutOfRange),
            Reply::Fault(kind) => Err(ClientError::Refused(kind)),
            other => Err(ClientError::UnexpectedReply {
                expected: "done",
                got: other,
            }),
        }
    }

    /// Asks whether `alias` has settled on its target.
    pub async fn in_position(&mut self, alias: &str) -> Result<bool, ClientError> {
        let request = Request::Check {
            alias: alias.to_string(),
        };
        match self.query(&request).await? {
            Reply::InPosition(settled) => Ok(settled),
            Reply::Fault(kind) => Err(ClientError::Refused(kind)),
            other => Err(ClientError::UnexpectedReply {
                expected: "0 or 1",
                got: other,
            }),
        }
    }

    /// Polls `check` every `poll_interval` until the device settles.
    ///
    /// # Errors
    ///
    /// [`ClientError::SettleTimeout`] once `deadline` has elapsed without
    /// an in-position reply; any transport or refusal error ends the wait
    /// immediately.
    pub async fn wait_settled(
        &mut self,
        alias: &str,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Result<(), ClientError> {
        let started = Instant::now();
        loop {
            if self.in_position(alias).await? {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(ClientError::SettleTimeout {
                    alias: alias.to_string(),
                });
            }
            sleep(poll_interval).await;
        }
    }

    /// Sends `closeconnection` and waits for the server's `bye!`.
    ///
    /// Consumes the client: after `bye!` the server closes the socket.
    pub async fn close(mut self) -> Result<(), ClientError> {
        match self.query(&Request::Close).await? {
            Reply::Bye => Ok(()),
            other => Err(ClientError::UnexpectedReply {
                expected: "bye!",
                got: other,
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use beamcom_core::COMMAND_SENTINEL;
    use tokio::net::TcpListener;

    /// Accepts one connection, then for each canned reply: reads one
    /// complete command frame, answers with the reply text verbatim.  When
    /// the replies run out it reads one more frame and closes the socket.
    async fn scripted_server(replies: Vec<&'static str>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf: Vec<u8> = Vec::new();
            let mut replies = replies.into_iter();
            loop {
                // Read one command frame.
                loop {
                    if let Some(frame) = find_frame(&buf, COMMAND_SENTINEL) {
                        let consumed = frame.consumed;
                        buf.drain(..consumed);
                        break;
                    }
                    let mut chunk = [0u8; 256];
                    let n = stream.read(&mut chunk).await.expect("server read");
                    if n == 0 {
                        return;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                match replies.next() {
                    Some(reply) => stream
                        .write_all(reply.as_bytes())
                        .await
                        .expect("server write"),
                    None => return,
                }
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_read_position_decodes_value() {
        let addr = scripted_server(vec!["current position: 512.5 eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        let value = client.read_position("exitslit").await.expect("read");

        assert_eq!(value, 512.5);
    }

    #[tokio::test]
    async fn test_write_acknowledged_with_done() {
        let addr = scripted_server(vec!["done eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        client.write("exitslit", 50.0).await.expect("write");
    }

    #[tokio::test]
    async fn test_out_of_range_reply_becomes_typed_error() {
        let addr = scripted_server(vec!["out-of-range eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        let result = client.write("photonenergy", 9999.0).await;

        assert!(matches!(result, Err(ClientError::OutOfRange)));
    }

    #[tokio::test]
    async fn test_fault_reply_surfaces_as_refusal() {
        let addr = scripted_server(vec!["error:unknown-alias eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        let result = client.read_position("bogus").await;

        assert!(matches!(
            result,
            Err(ClientError::Refused(FaultKind::UnknownAlias))
        ));
    }

    #[tokio::test]
    async fn test_in_position_parses_both_digits() {
        let addr = scripted_server(vec!["0 eoa", "1 eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        assert!(!client.in_position("exitslit").await.expect("first check"));
        assert!(client.in_position("exitslit").await.expect("second check"));
    }

    #[tokio::test]
    async fn test_wait_settled_polls_until_in_position() {
        let addr = scripted_server(vec!["0 eoa", "0 eoa", "1 eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        client
            .wait_settled("exitslit", Duration::from_millis(10), Duration::from_secs(5))
            .await
            .expect("settles on the third poll");
    }

    #[tokio::test]
    async fn test_close_expects_bye() {
        let addr = scripted_server(vec!["bye! eoa"]).await;
        let client = BeamClient::connect(addr).await.expect("connect");

        client.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_reply_split_across_segments_is_reassembled() {
        // Hand-rolled server that dribbles the reply out in two pieces.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut scratch = [0u8; 256];
            let _ = stream.read(&mut scratch).await.expect("server read");
            stream
                .write_all(b"current posi")
                .await
                .expect("first piece");
            stream.flush().await.expect("flush");
            tokio::time::sleep(Duration::from_millis(20)).await;
            stream
                .write_all(b"tion: 440.0 eoa")
                .await
                .expect("second piece");
        });

        let mut client = BeamClient::connect(addr).await.expect("connect");
        let value = client.read_position("mono").await.expect("read");

        assert_eq!(value, 440.0);
    }

    #[tokio::test]
    async fn test_server_closing_early_reports_closed() {
        // Zero canned replies: the server reads the command, then hangs up.
        let addr = scripted_server(vec![]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        let result = client.read_position("mono").await;

        assert!(matches!(result, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn test_connect_refused_reports_address() {
        // Port 1 is essentially never listening on loopback.
        let addr: SocketAddr = "127.0.0.1:1".parse().expect("addr");

        let result = BeamClient::connect(addr).await;

        assert!(matches!(result, Err(ClientError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_undecodable_reply_is_a_protocol_error() {
        let addr = scripted_server(vec!["gibberish eoa"]).await;
        let mut client = BeamClient::connect(addr).await.expect("connect");

        let result = client.read_position("mono").await;

        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
