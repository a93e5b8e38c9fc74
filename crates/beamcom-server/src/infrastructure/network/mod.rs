//! Network infrastructure for the control daemon.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds the listening socket (SO_REUSEADDR, backlog 1)
//!   and runs the accept loop.  Connections are served strictly one at a
//!   time; while a session is active no further accept happens.
//!
//! - **`session`** – The per-connection serving loop: buffers bytes until a
//!   complete `eoc`-terminated frame arrives, dispatches it, and writes the
//!   `eoa`-terminated reply back.  Generic over the stream type so it can be
//!   unit-tested against `tokio_test::io` mocks without a real socket.

pub mod listener;
pub mod session;

pub use listener::ComServer;
pub use session::{run_session, SessionEnd, SessionError, MAX_COMMAND_BYTES};
