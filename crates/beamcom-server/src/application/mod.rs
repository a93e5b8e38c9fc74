//! Application layer use cases for the control daemon.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure device kinematics in `beamcom_core`) and the infrastructure
//! (sockets, configuration files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil one client command (e.g.,
//!   "look up the addressed device, interpolate its position, pick the
//!   reply text").
//! - **Contain no OS calls, no network I/O, no file system access**: the
//!   session loop in the infrastructure layer owns the socket and merely
//!   hands parsed requests down here.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – Executes one parsed [`beamcom_core::Request`] against
//!   the device registry and produces the reply plus a close-connection
//!   decision.  Every command a client can send funnels through this one
//!   function, which is what guarantees that every command gets an answer.

pub mod dispatch;
