// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by hosts embedding the warden. Configuration is loaded from the
//! environment at startup; every variable is optional.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WARDEN_DATA_DIR` | Root directory for session db and artifacts | `/data` |
//! | `WARDEN_MAX_SESSION_AGE_SECS` | Absolute session lifetime ceiling | `2592000` (30 days) |
//! | `WARDEN_REFRESH_AFTER_SECS` | Idle window before `login_time` slides | `3600` (1 hour) |
//! | `WARDEN_VERIFY_PROBABILITY` | Per-request chance of a live identity check | `0.25` |
//! | `WARDEN_VERIFY_TIMEOUT_SECS` | Upper bound on the live identity call | `5` |
//! | `WARDEN_VERIFY_COOLDOWN_SECS` | Skip re-checks this soon after a success (`0` disables) | `0` |
//! | `WARDEN_PROVIDER_URL` | Identity provider account endpoint base URL | None (verification disabled) |
//! | `WARDEN_CACHE_CAPACITY` | Maximum cached per-session results | `256` |
//! | `WARDEN_CACHE_TTL_SECS` | Time-to-live for cached results | `300` |

use std::path::PathBuf;
use std::time::Duration;

use crate::session::ValidationPolicy;
use crate::storage::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};

/// Environment variable name for the data directory path.
///
/// The session database lives at `<data_dir>/sessions.redb` and uploaded
/// artifacts under `<data_dir>/artifacts/`.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "WARDEN_DATA_DIR";

/// Environment variable for the absolute session age ceiling, in seconds.
pub const MAX_SESSION_AGE_ENV: &str = "WARDEN_MAX_SESSION_AGE_SECS";

/// Environment variable for the idle refresh window, in seconds.
pub const REFRESH_AFTER_ENV: &str = "WARDEN_REFRESH_AFTER_SECS";

/// Environment variable for the live verification sampling rate.
pub const VERIFY_PROBABILITY_ENV: &str = "WARDEN_VERIFY_PROBABILITY";

/// Environment variable for the live verification timeout, in seconds.
pub const VERIFY_TIMEOUT_ENV: &str = "WARDEN_VERIFY_TIMEOUT_SECS";

/// Environment variable for the verification cooldown, in seconds.
/// Zero (the default) disables the cooldown.
pub const VERIFY_COOLDOWN_ENV: &str = "WARDEN_VERIFY_COOLDOWN_SECS";

/// Environment variable for the identity provider base URL.
pub const PROVIDER_URL_ENV: &str = "WARDEN_PROVIDER_URL";

/// Environment variable for the result cache capacity.
pub const CACHE_CAPACITY_ENV: &str = "WARDEN_CACHE_CAPACITY";

/// Environment variable for the result cache TTL, in seconds.
pub const CACHE_TTL_ENV: &str = "WARDEN_CACHE_TTL_SECS";

const DEFAULT_DATA_DIR: &str = "/data";

/// Everything a host needs to wire up a warden.
#[derive(Debug, Clone, PartialEq)]
pub struct WardenConfig {
    /// Root directory for the session database and artifact storage.
    pub data_dir: PathBuf,

    /// Validation thresholds.
    pub policy: ValidationPolicy,

    /// Identity provider account endpoint base URL, when live
    /// verification is wired up.
    pub provider_url: Option<String>,

    /// Maximum number of cached per-session results.
    pub cache_capacity: usize,

    /// Time-to-live for cached results.
    pub cache_ttl: Duration,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            policy: ValidationPolicy::default(),
            provider_url: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl WardenConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ValidationPolicy::default();

        let policy = ValidationPolicy::default()
            .with_max_session_age(chrono::Duration::seconds(parsed(
                &lookup,
                MAX_SESSION_AGE_ENV,
                defaults.max_session_age.num_seconds(),
            )))
            .with_refresh_after(chrono::Duration::seconds(parsed(
                &lookup,
                REFRESH_AFTER_ENV,
                defaults.refresh_after.num_seconds(),
            )))
            .with_verify_probability(parsed(
                &lookup,
                VERIFY_PROBABILITY_ENV,
                defaults.verify_probability,
            ))
            .with_verify_timeout(Duration::from_secs(parsed(
                &lookup,
                VERIFY_TIMEOUT_ENV,
                defaults.verify_timeout.as_secs(),
            )))
            .with_verify_cooldown(match parsed(&lookup, VERIFY_COOLDOWN_ENV, 0i64) {
                secs if secs > 0 => Some(chrono::Duration::seconds(secs)),
                _ => None,
            });

        Self {
            data_dir: PathBuf::from(trimmed(&lookup, DATA_DIR_ENV).unwrap_or_else(|| {
                DEFAULT_DATA_DIR.to_string()
            })),
            policy,
            provider_url: trimmed(&lookup, PROVIDER_URL_ENV),
            cache_capacity: parsed(&lookup, CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY),
            cache_ttl: Duration::from_secs(parsed(
                &lookup,
                CACHE_TTL_ENV,
                DEFAULT_CACHE_TTL.as_secs(),
            )),
        }
    }

    /// Path of the embedded session database.
    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir.join("sessions.redb")
    }

    /// Root directory for uploaded artifacts.
    pub fn artifact_root(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }
}

fn trimmed(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match trimmed(lookup, name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "Unparseable value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> WardenConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WardenConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.session_db_path(), PathBuf::from("/data/sessions.redb"));
        assert_eq!(config.artifact_root(), PathBuf::from("/data/artifacts"));
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("WARDEN_DATA_DIR", "/tmp/warden"),
            ("WARDEN_MAX_SESSION_AGE_SECS", "86400"),
            ("WARDEN_REFRESH_AFTER_SECS", "600"),
            ("WARDEN_VERIFY_PROBABILITY", "0.5"),
            ("WARDEN_VERIFY_TIMEOUT_SECS", "2"),
            ("WARDEN_VERIFY_COOLDOWN_SECS", "120"),
            ("WARDEN_PROVIDER_URL", "https://idp.example.com/accounts"),
            ("WARDEN_CACHE_CAPACITY", "16"),
            ("WARDEN_CACHE_TTL_SECS", "30"),
        ]);

        assert_eq!(config.data_dir, PathBuf::from("/tmp/warden"));
        assert_eq!(config.policy.max_session_age, chrono::Duration::seconds(86400));
        assert_eq!(config.policy.refresh_after, chrono::Duration::seconds(600));
        assert_eq!(config.policy.verify_probability, 0.5);
        assert_eq!(config.policy.verify_timeout, Duration::from_secs(2));
        assert_eq!(
            config.policy.verify_cooldown,
            Some(chrono::Duration::seconds(120))
        );
        assert_eq!(
            config.provider_url.as_deref(),
            Some("https://idp.example.com/accounts")
        );
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("WARDEN_MAX_SESSION_AGE_SECS", "a month"),
            ("WARDEN_VERIFY_PROBABILITY", ""),
            ("WARDEN_PROVIDER_URL", "   "),
        ]);

        assert_eq!(config.policy.max_session_age, chrono::Duration::seconds(2_592_000));
        assert_eq!(config.policy.verify_probability, 0.25);
        assert!(config.provider_url.is_none());
    }

    #[test]
    fn zero_cooldown_means_disabled() {
        let config = config_from(&[("WARDEN_VERIFY_COOLDOWN_SECS", "0")]);
        assert!(config.policy.verify_cooldown.is_none());
    }
}
