//! Integration tests for the command dispatch pipeline.
//!
//! These tests exercise the application layer of beamcom-server end-to-end:
//! TOML config → `AppConfig::device_specs` → `DeviceRegistry` →
//! `dispatch::execute`, with no sockets involved.  The wire-level
//! counterpart lives in `server_integration.rs`.

use std::time::{Duration, Instant};

use beamcom_core::DeviceRegistry;
use beamcom_server::infrastructure::storage::config::AppConfig;

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Builds a registry from the built-in default device table.
fn default_registry(now: Instant) -> DeviceRegistry {
    let specs = AppConfig::default()
        .device_specs()
        .expect("default table must convert to specs");
    DeviceRegistry::from_specs(specs, now).expect("default table must be valid")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_default_config_builds_the_full_beamline_registry() {
    let now = Instant::now();
    let registry = default_registry(now);

    assert_eq!(registry.len(), 18, "default table must hold 18 devices");
    for alias in ["photonenergy", "mono", "ringcurrent", "pressure", "screen"] {
        assert!(registry.contains(alias), "{alias} must be in the table");
    }

    // Every device rests at 0.0 until something writes to it
    let value = registry
        .position("ringcurrent", now)
        .expect("ringcurrent must be readable");
    assert_eq!(value, 0.0);
}

#[test]
fn test_set_then_read_reports_interpolated_motion() {
    use beamcom_core::{Reply, Request};
    use beamcom_server::application::dispatch;

    let t0 = Instant::now();
    let mut registry = default_registry(t0);

    // Act: retarget the photon energy (speed 10.0 → a 50 s move)
    let write = Request::Write {
        alias: "photonenergy".to_string(),
        value: 500.0,
    };
    let outcome = dispatch::execute(&mut registry, &write, t0);
    assert_eq!(outcome.reply, Reply::Done);
    assert!(!outcome.close_after_reply);

    // 20 s in: 20 s × 10 units/s of travel covered
    let read = Request::Read {
        alias: "photonenergy".to_string(),
    };
    let outcome = dispatch::execute(&mut registry, &read, t0 + Duration::from_secs(20));
    assert_eq!(outcome.reply, Reply::Position(200.0));

    // At settle time the reported value is the target bit-exactly
    let outcome = dispatch::execute(&mut registry, &read, t0 + Duration::from_secs(50));
    assert_eq!(outcome.reply, Reply::Position(500.0));
}

#[test]
fn test_check_flips_once_the_move_settles() {
    use beamcom_core::{Reply, Request};
    use beamcom_server::application::dispatch;

    let t0 = Instant::now();
    let mut registry = default_registry(t0);

    let write = Request::Write {
        alias: "photonenergy".to_string(),
        value: 500.0,
    };
    dispatch::execute(&mut registry, &write, t0);

    let check = Request::Check {
        alias: "photonenergy".to_string(),
    };
    let outcome = dispatch::execute(&mut registry, &check, t0 + Duration::from_secs(49));
    assert_eq!(outcome.reply, Reply::InPosition(false), "still 10 units short");

    let outcome = dispatch::execute(&mut registry, &check, t0 + Duration::from_secs(50));
    assert_eq!(outcome.reply, Reply::InPosition(true), "settled at exactly 50 s");
}

#[test]
fn test_policy_refusals_surface_as_replies_not_silence() {
    use beamcom_core::{FaultKind, Reply, Request};
    use beamcom_server::application::dispatch;

    let t0 = Instant::now();
    let mut registry = default_registry(t0);

    // Sensor: readable but not settable
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Write {
            alias: "ringcurrent".to_string(),
            value: 5.0,
        },
        t0,
    );
    assert_eq!(outcome.reply, Reply::Fault(FaultKind::ReadOnly));
    assert!(!outcome.close_after_reply, "a refusal must not end the session");

    // Alias that is not in the table at all
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Read {
            alias: "vortex".to_string(),
        },
        t0,
    );
    assert_eq!(outcome.reply, Reply::Fault(FaultKind::UnknownAlias));

    // Below the photon energy's lower soft limit of 240
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Write {
            alias: "photonenergy".to_string(),
            value: 100.0,
        },
        t0,
    );
    assert_eq!(outcome.reply, Reply::OutOfRange);

    // None of the refusals may have moved anything
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Read {
            alias: "photonenergy".to_string(),
        },
        t0 + Duration::from_secs(60),
    );
    assert_eq!(outcome.reply, Reply::Position(0.0), "refused writes must not move the device");
}

#[test]
fn test_closeconnection_is_the_only_outcome_that_ends_the_session() {
    use beamcom_core::{Reply, Request};
    use beamcom_server::application::dispatch;

    let t0 = Instant::now();
    let mut registry = default_registry(t0);

    let outcome = dispatch::execute(&mut registry, &Request::Close, t0);
    assert_eq!(outcome.reply, Reply::Bye);
    assert!(outcome.close_after_reply, "closeconnection must end the session");

    let outcome = dispatch::execute(
        &mut registry,
        &Request::Read {
            alias: "mono".to_string(),
        },
        t0,
    );
    assert!(!outcome.close_after_reply, "reads must leave the session open");
}

#[test]
fn test_custom_toml_table_drives_dispatch() {
    use beamcom_core::{Reply, Request};
    use beamcom_server::application::dispatch;

    let cfg: AppConfig = toml::from_str(
        r#"
        [server]
        port = 4040

        [[devices]]
        alias = "samplez"
        value = 5.0
        speed = 2.5
        writable = true
        min = -10.0
        max = 10.0
        "#,
    )
    .expect("literal config must parse");
    assert_eq!(cfg.server.port, 4040);
    assert_eq!(cfg.server.bind_address, "0.0.0.0", "bind address must default");

    let t0 = Instant::now();
    let specs = cfg.device_specs().expect("limits are two-sided");
    let mut registry = DeviceRegistry::from_specs(specs, t0).expect("table must be valid");

    // The upper soft limit is inclusive
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Write {
            alias: "samplez".to_string(),
            value: 10.0,
        },
        t0,
    );
    assert_eq!(outcome.reply, Reply::Done);

    // 1 s into a 2 s move at speed 2.5: 5.0 + 2.5
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Read {
            alias: "samplez".to_string(),
        },
        t0 + Duration::from_secs(1),
    );
    assert_eq!(outcome.reply, Reply::Position(7.5));

    // Just past the limit is refused
    let outcome = dispatch::execute(
        &mut registry,
        &Request::Write {
            alias: "samplez".to_string(),
            value: 10.5,
        },
        t0,
    );
    assert_eq!(outcome.reply, Reply::OutOfRange);
}

#[test]
fn test_shipped_debian_config_matches_builtin_defaults() {
    // The .deb package installs debian/config.toml to /etc/beamcom/, and the
    // daemon falls back to AppConfig::default() when that file is absent.
    // The two tables must stay identical or behaviour would change depending
    // on whether the config file exists.
    let shipped: AppConfig = toml::from_str(include_str!("../debian/config.toml"))
        .expect("shipped config must parse");

    assert_eq!(shipped, AppConfig::default());
}
