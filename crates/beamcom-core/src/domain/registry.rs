//! The device registry: alias lookup and write policy.
//!
//! The registry is built once at server start from a list of device specs
//! and its key set never changes afterwards.  Commands address devices by
//! alias; an alias that is not in the registry is a recoverable command
//! fault, never a crash.  Write policy lives here too: some devices are
//! read-only sensors (ring current, vacuum pressure), and writable devices
//! may carry soft limits that reject setpoints outside the physically safe
//! range.

use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;

use super::device::Device;

/// Errors a command can run into at dispatch time.
///
/// These are recoverable: the session answers them with a reply and keeps
/// serving.  Construction problems are a separate type ([`SpecError`])
/// because they abort startup instead.
#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    /// A command referenced an alias that is not in the registry.
    #[error("unknown device alias {0:?}")]
    UnknownAlias(String),

    /// A write addressed a device that does not accept writes.
    #[error("device {0:?} is read-only")]
    ReadOnly(String),

    /// A write value fell outside the device's configured soft limits.
    #[error("value {value} outside limits [{min}, {max}] for device {alias:?}")]
    OutOfRange {
        /// Alias of the device that rejected the write.
        alias: String,
        /// The rejected setpoint.
        value: f64,
        /// Lower soft limit, inclusive.
        min: f64,
        /// Upper soft limit, inclusive.
        max: f64,
    },
}

/// Errors found while validating the startup device table.
#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    /// Two specs in the startup list share an alias.
    #[error("duplicate device alias {0:?}")]
    DuplicateAlias(String),

    /// A spec has an empty alias string.
    #[error("device alias must not be empty")]
    EmptyAlias,

    /// A spec's speed is zero, negative, or not finite.
    #[error("device {alias:?} has invalid speed {speed}")]
    InvalidSpeed {
        /// Alias of the offending spec.
        alias: String,
        /// The rejected speed.
        speed: f64,
    },

    /// A spec's initial value is not finite.
    #[error("device {alias:?} has non-finite initial value {value}")]
    InvalidInitial {
        /// Alias of the offending spec.
        alias: String,
        /// The rejected initial value.
        value: f64,
    },

    /// A spec's soft limits are not finite or are not ordered `min < max`.
    #[error("device {alias:?} has invalid limits [{min}, {max}]")]
    InvalidLimits {
        /// Alias of the offending spec.
        alias: String,
        /// Configured lower limit.
        min: f64,
        /// Configured upper limit.
        max: f64,
    },
}

/// Inclusive soft-limit range for write values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Lowest accepted setpoint.
    pub min: f64,
    /// Highest accepted setpoint.
    pub max: f64,
}

impl Limits {
    /// Returns `true` if `value` lies inside the range, bounds included.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Startup description of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    /// Alias the wire protocol addresses the device by.
    pub alias: String,
    /// Value the device rests at when the server starts.
    pub initial: f64,
    /// Travel speed in value units per second.
    pub speed: f64,
    /// Whether `set`/`send` may retarget this device.
    pub writable: bool,
    /// Optional soft limits consulted on writes only.
    pub limits: Option<Limits>,
}

impl DeviceSpec {
    /// Creates a read-only spec with no limits.
    pub fn new(alias: impl Into<String>, initial: f64, speed: f64) -> Self {
        Self {
            alias: alias.into(),
            initial,
            speed,
            writable: false,
            limits: None,
        }
    }

    /// Marks the device as accepting writes.
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Attaches inclusive soft limits checked on every write.
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some(Limits { min, max });
        self
    }
}

struct Entry {
    device: Device,
    writable: bool,
    limits: Option<Limits>,
}

/// Fixed alias → device mapping plus the per-device write policy.
pub struct DeviceRegistry {
    entries: HashMap<String, Entry>,
}

impl DeviceRegistry {
    /// Builds the registry, validating every spec.
    ///
    /// All devices share `now` as their creation instant and rest at their
    /// initial value until the first write.
    ///
    /// # Errors
    ///
    /// Returns the first [`SpecError`] found: empty or duplicate aliases,
    /// non-finite initial values, non-positive speeds, or malformed limits.
    pub fn from_specs<I>(specs: I, now: Instant) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = DeviceSpec>,
    {
        let mut entries = HashMap::new();
        for spec in specs {
            if spec.alias.is_empty() {
                return Err(SpecError::EmptyAlias);
            }
            if !spec.initial.is_finite() {
                return Err(SpecError::InvalidInitial {
                    alias: spec.alias,
                    value: spec.initial,
                });
            }
            if !spec.speed.is_finite() || spec.speed <= 0.0 {
                return Err(SpecError::InvalidSpeed {
                    alias: spec.alias,
                    speed: spec.speed,
                });
            }
            if let Some(limits) = spec.limits {
                if !limits.min.is_finite() || !limits.max.is_finite() || limits.min >= limits.max {
                    return Err(SpecError::InvalidLimits {
                        alias: spec.alias,
                        min: limits.min,
                        max: limits.max,
                    });
                }
            }
            let entry = Entry {
                device: Device::new(spec.initial, spec.speed, now),
                writable: spec.writable,
                limits: spec.limits,
            };
            if entries.insert(spec.alias.clone(), entry).is_some() {
                return Err(SpecError::DuplicateAlias(spec.alias));
            }
        }
        Ok(Self { entries })
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `alias` is registered.
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Iterates over the registered aliases in unspecified order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the device registered under `alias`, if any.
    pub fn device(&self, alias: &str) -> Option<&Device> {
        self.entries.get(alias).map(|entry| &entry.device)
    }

    /// Reports the interpolated position of `alias` at `now`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::UnknownAlias`] if the alias is not registered.
    pub fn position(&self, alias: &str, now: Instant) -> Result<f64, DeviceError> {
        Ok(self.entry(alias)?.device.value_at(now))
    }

    /// Reports whether `alias` has settled on its target at `now`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::UnknownAlias`] if the alias is not registered.
    pub fn in_position(&self, alias: &str, now: Instant) -> Result<bool, DeviceError> {
        Ok(self.entry(alias)?.device.in_position(now))
    }

    /// Retargets `alias` to `value`, enforcing the write policy.
    ///
    /// On success the device starts moving from its current interpolated
    /// position.  On any error the device is left exactly as it was: a
    /// rejected write has no partial effect.
    ///
    /// # Errors
    ///
    /// [`DeviceError::UnknownAlias`], [`DeviceError::ReadOnly`], or
    /// [`DeviceError::OutOfRange`].
    pub fn write(&mut self, alias: &str, value: f64, now: Instant) -> Result<(), DeviceError> {
        let entry = self
            .entries
            .get_mut(alias)
            .ok_or_else(|| DeviceError::UnknownAlias(alias.to_string()))?;
        if !entry.writable {
            return Err(DeviceError::ReadOnly(alias.to_string()));
        }
        if let Some(limits) = entry.limits {
            if !limits.contains(value) {
                return Err(DeviceError::OutOfRange {
                    alias: alias.to_string(),
                    value,
                    min: limits.min,
                    max: limits.max,
                });
            }
        }
        entry.device.move_to(value, now);
        Ok(())
    }

    fn entry(&self, alias: &str) -> Result<&Entry, DeviceError> {
        self.entries
            .get(alias)
            .ok_or_else(|| DeviceError::UnknownAlias(alias.to_string()))
    }
}
