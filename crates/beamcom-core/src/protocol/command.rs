//! Typed request commands for the beamcom wire protocol.
//!
//! A raw frame like `set photonenergy 650 eoc` is parsed (in
//! [`crate::protocol::codec`]) into a [`Request`] value, which the server
//! dispatcher matches exhaustively.  Making the command a tagged enum means
//! "verb not recognized" is a parse error the session answers explicitly,
//! never a silent fall-through inside dispatch.

use std::fmt;

/// The verbs a client may send, in their exact wire spelling.
///
/// Matching is case-sensitive: the upstream control layer sends lower-case
/// only, and `READ` has never been a valid command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Start a move: `set <alias> <value>`.
    Set,
    /// Report the current interpolated position: `read <alias>`.
    Read,
    /// Synonym of `set`, kept for wire compatibility: `send <alias> <value>`.
    Send,
    /// Report whether the device has settled: `check <alias>`.
    Check,
    /// End the session: `closeconnection`.
    CloseConnection,
}

impl Verb {
    /// Returns the wire spelling of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Set => "set",
            Verb::Read => "read",
            Verb::Send => "send",
            Verb::Check => "check",
            Verb::CloseConnection => "closeconnection",
        }
    }
}

impl TryFrom<&str> for Verb {
    type Error = ();

    fn try_from(token: &str) -> Result<Self, Self::Error> {
        match token {
            "set" => Ok(Verb::Set),
            "read" => Ok(Verb::Read),
            "send" => Ok(Verb::Send),
            "check" => Ok(Verb::Check),
            "closeconnection" => Ok(Verb::CloseConnection),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed client request.
///
/// `set` and `send` are synonyms on the wire and both parse to
/// [`Request::Write`]; when re-encoded (by the client library) a write is
/// always spelled `set`.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `read <alias>` – report the current interpolated position.
    Read {
        /// Device alias to query.
        alias: String,
    },
    /// `check <alias>` – report `1` if the device has settled, else `0`.
    Check {
        /// Device alias to query.
        alias: String,
    },
    /// `set <alias> <value>` / `send <alias> <value>` – retarget the device.
    Write {
        /// Device alias to move.
        alias: String,
        /// New target value, guaranteed finite by the parser.
        value: f64,
    },
    /// `closeconnection` – reply `bye!` and end the session.
    Close,
}

impl Request {
    /// Returns the verb this request is encoded with.
    pub fn verb(&self) -> Verb {
        match self {
            Request::Read { .. } => Verb::Read,
            Request::Check { .. } => Verb::Check,
            Request::Write { .. } => Verb::Set,
            Request::Close => Verb::CloseConnection,
        }
    }

    /// Returns the device alias the request addresses, if any.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Request::Read { alias } | Request::Check { alias } | Request::Write { alias, .. } => {
                Some(alias)
            }
            Request::Close => None,
        }
    }
}

impl fmt::Display for Request {
    /// Formats the request body as it appears on the wire, without the
    /// trailing sentinel.  Float values are rendered with a fractional part
    /// (`650.0`, not `650`) so wire text round-trips through the parser.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Read { alias } => write!(f, "read {alias}"),
            Request::Check { alias } => write!(f, "check {alias}"),
            Request::Write { alias, value } => write!(f, "set {alias} {value:?}"),
            Request::Close => f.write_str("closeconnection"),
        }
    }
}
