//! Domain entities for beamcom.
//!
//! This module contains pure simulation logic with no infrastructure
//! dependencies: no sockets, no configuration parsing, no logging.  Time
//! enters only as [`std::time::Instant`] values supplied by callers, which
//! is what makes the kinematics unit-testable without sleeping.
//!
//! Code in outer layers (the server's dispatcher and network loop, the
//! client tools) depends on this module; it never depends on them.

/// Constant-speed device kinematics.
///
/// See [`device::Device`] for the main type.
pub mod device;

/// Alias lookup and write policy.
///
/// See [`registry::DeviceRegistry`] for the main type.
pub mod registry;
