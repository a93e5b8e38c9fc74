//! Sentinel-framed text codec for the beamcom wire protocol.
//!
//! # Wire format
//!
//! ```text
//! request:  <verb> [<alias>] [<value>] eoc
//! reply:    <payload> eoa
//! ```
//!
//! Messages are plain text.  There is no length prefix and no newline
//! requirement: a message ends where its sentinel token appears (`eoc`,
//! "end of command", for requests; `eoa`, "end of answer", for replies).
//! Tokens are separated by ASCII whitespace, a single space in practice.
//!
//! # Framing (for beginners)
//!
//! TCP delivers a byte stream, not messages: one `read` from the socket may
//! contain half a command, exactly one, or one and a half.  The server
//! therefore appends everything it reads to a buffer and asks
//! [`find_frame`] whether a complete frame is present.  The legacy
//! implementation did the same thing one byte at a time, comparing the
//! last four bytes against `" eoc"`; scanning a buffer is equivalent but
//! also copes with two commands arriving back to back.  The sentinel only
//! counts at a token boundary, so an alias that merely *contains* `eoc`
//! (say `eocmeter`) does not end the frame.

use std::str;

use thiserror::Error;

use super::command::{Request, Verb};
use super::reply::{FaultKind, Reply, POSITION_PREFIX};

/// Sentinel token terminating every request.
pub const COMMAND_SENTINEL: &str = "eoc";

/// Sentinel token terminating every reply.
pub const REPLY_SENTINEL: &str = "eoa";

/// Errors produced while decoding wire text.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] str::Utf8Error),

    /// The frame contained no tokens before its sentinel.
    #[error("empty command")]
    EmptyCommand,

    /// The first token is not one of the five recognized verbs.
    #[error("unknown verb {0:?}")]
    UnknownVerb(String),

    /// The verb requires a device alias and none was given.
    #[error("verb {verb} requires a device alias")]
    MissingAlias {
        /// Wire spelling of the verb that was missing its alias.
        verb: &'static str,
    },

    /// The write verbs require a value and none was given.
    #[error("verb {verb} requires a value")]
    MissingValue {
        /// Wire spelling of the verb that was missing its value.
        verb: &'static str,
    },

    /// The value token did not parse as a finite floating-point number.
    #[error("invalid value {token:?}: expected a finite number")]
    InvalidValue {
        /// The offending token as received.
        token: String,
    },

    /// A reply payload matched none of the known shapes (client side).
    #[error("unrecognized reply payload {0:?}")]
    InvalidReply(String),
}

// ── Framing ───────────────────────────────────────────────────────────────────

/// A complete frame located inside a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Payload bytes preceding the sentinel, surrounding whitespace intact.
    pub payload: &'a [u8],
    /// Total bytes consumed from the buffer, sentinel included.
    pub consumed: usize,
}

/// Scans `buf` for the earliest occurrence of `sentinel` at a token
/// boundary (preceded by buffer start or whitespace, followed by buffer end
/// or whitespace) and returns the frame ending there.
///
/// Returns `None` while the buffer holds no complete frame yet; the caller
/// keeps reading and retries with the grown buffer.  After handling a frame
/// the caller drains `consumed` bytes and scans again, which is how several
/// commands arriving in one read are served in order.
///
/// # Examples
///
/// ```
/// use beamcom_core::protocol::codec::{find_frame, COMMAND_SENTINEL};
///
/// let buf = b"read photonenergy eoc";
/// let frame = find_frame(buf, COMMAND_SENTINEL).unwrap();
/// assert_eq!(frame.payload, b"read photonenergy ");
/// assert_eq!(frame.consumed, buf.len());
///
/// assert!(find_frame(b"read photonen", COMMAND_SENTINEL).is_none());
/// ```
pub fn find_frame<'a>(buf: &'a [u8], sentinel: &str) -> Option<Frame<'a>> {
    let token = sentinel.as_bytes();
    let mut from = 0;
    while from + token.len() <= buf.len() {
        let pos = buf[from..]
            .windows(token.len())
            .position(|window| window == token)?;
        let at = from + pos;
        let end = at + token.len();
        let boundary_before = at == 0 || buf[at - 1].is_ascii_whitespace();
        let boundary_after = end == buf.len() || buf[end].is_ascii_whitespace();
        if boundary_before && boundary_after {
            return Some(Frame {
                payload: &buf[..at],
                consumed: end,
            });
        }
        from = at + 1;
    }
    None
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Decodes a request frame payload (the bytes before `eoc`) into a
/// [`Request`].
///
/// # Errors
///
/// Returns a [`ProtocolError`] if the payload is not UTF-8, is empty, names
/// an unrecognized verb, or is missing its alias or value.  Decoding never
/// panics on arbitrary input; the session answers parse failures with an
/// `error:` reply instead of dropping the connection.
pub fn decode_request(payload: &[u8]) -> Result<Request, ProtocolError> {
    let text = str::from_utf8(payload)?;
    parse_request(text)
}

/// Encodes a request as wire text, sentinel included.
///
/// # Examples
///
/// ```
/// use beamcom_core::protocol::codec::encode_request;
/// use beamcom_core::protocol::command::Request;
///
/// let request = Request::Write {
///     alias: "photonenergy".to_string(),
///     value: 650.0,
/// };
/// assert_eq!(encode_request(&request), "set photonenergy 650.0 eoc");
/// ```
pub fn encode_request(request: &Request) -> String {
    format!("{request} {COMMAND_SENTINEL}")
}

fn parse_request(text: &str) -> Result<Request, ProtocolError> {
    let mut tokens = text.split_whitespace();
    let verb_token = tokens.next().ok_or(ProtocolError::EmptyCommand)?;
    let verb = Verb::try_from(verb_token)
        .map_err(|()| ProtocolError::UnknownVerb(verb_token.to_string()))?;

    // Tokens beyond what the verb needs are ignored, as in the original
    // split-based parser.
    match verb {
        Verb::Read => Ok(Request::Read {
            alias: require_alias(&mut tokens, verb)?,
        }),
        Verb::Check => Ok(Request::Check {
            alias: require_alias(&mut tokens, verb)?,
        }),
        Verb::Set | Verb::Send => {
            let alias = require_alias(&mut tokens, verb)?;
            let value = require_value(&mut tokens, verb)?;
            Ok(Request::Write { alias, value })
        }
        Verb::CloseConnection => Ok(Request::Close),
    }
}

fn require_alias<'a, I>(tokens: &mut I, verb: Verb) -> Result<String, ProtocolError>
where
    I: Iterator<Item = &'a str>,
{
    tokens
        .next()
        .map(str::to_string)
        .ok_or(ProtocolError::MissingAlias {
            verb: verb.as_str(),
        })
}

fn require_value<'a, I>(tokens: &mut I, verb: Verb) -> Result<f64, ProtocolError>
where
    I: Iterator<Item = &'a str>,
{
    let token = tokens.next().ok_or(ProtocolError::MissingValue {
        verb: verb.as_str(),
    })?;
    // `f64::from_str` accepts "inf" and "NaN"; neither is a usable setpoint
    // and both would poison the kinematics, so they are rejected here.
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProtocolError::InvalidValue {
            token: token.to_string(),
        }),
    }
}

// ── Replies ───────────────────────────────────────────────────────────────────

/// Decodes a reply frame payload (the bytes before `eoa`) into a [`Reply`].
///
/// Used by the client library and the integration tests; the server only
/// encodes replies.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidReply`] if the payload matches none of
/// the known shapes, or [`ProtocolError::InvalidUtf8`] for non-text bytes.
pub fn decode_reply(payload: &[u8]) -> Result<Reply, ProtocolError> {
    let text = str::from_utf8(payload)?.trim();
    if let Some(rest) = text.strip_prefix(POSITION_PREFIX) {
        return match rest.trim().parse::<f64>() {
            Ok(value) => Ok(Reply::Position(value)),
            Err(_) => Err(ProtocolError::InvalidReply(text.to_string())),
        };
    }
    if let Some(reason) = text.strip_prefix("error:") {
        return FaultKind::from_reason(reason)
            .map(Reply::Fault)
            .ok_or_else(|| ProtocolError::InvalidReply(text.to_string()));
    }
    match text {
        "done" => Ok(Reply::Done),
        "1" => Ok(Reply::InPosition(true)),
        "0" => Ok(Reply::InPosition(false)),
        "bye!" => Ok(Reply::Bye),
        "out-of-range" => Ok(Reply::OutOfRange),
        other => Err(ProtocolError::InvalidReply(other.to_string())),
    }
}

/// Encodes a reply as wire text, sentinel included.
pub fn encode_reply(reply: &Reply) -> String {
    format!("{reply} {REPLY_SENTINEL}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
