// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session identity: opaque keys and the per-session attribute record.
//!
//! A [`SessionRecord`] is the complete server-side state for one client
//! session: a small flat mapping serialized as JSON with epoch-second
//! timestamps. Anything beyond these four attributes (display names,
//! avatars, locale) belongs to the host application, not here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque session key, typically the value of a client-side cookie.
///
/// The key is never interpreted; it only names a row in the session store
/// and a directory of uploaded artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Attributes stored per session key.
///
/// ## Lifecycle
///
/// - Created at login with `user_id` and `login_time` set.
/// - Mutated by the validator: `login_time` slides forward on idle
///   refresh, `last_verified_time` on a successful live identity check.
/// - Removed in full when the session expires, fails verification, or
///   logs out. Logout leaves a tombstone (see
///   [`SessionRecord::logged_out_tombstone`]) so artifact sweeping can
///   still see that the key's owner left deliberately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Provider-issued user identifier. Absent or empty means anonymous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Time of the last full authentication, epoch seconds.
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub login_time: Option<DateTime<Utc>>,

    /// Time of the last successful live identity re-check, epoch seconds.
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_verified_time: Option<DateTime<Utc>>,

    /// Set by logout. A record carrying this flag is never authenticated.
    #[serde(default)]
    pub explicitly_logged_out: bool,
}

impl SessionRecord {
    /// Fresh record for a successful login.
    pub fn new(user_id: impl Into<String>, login_time: DateTime<Utc>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            login_time: Some(login_time),
            last_verified_time: None,
            explicitly_logged_out: false,
        }
    }

    /// What logout leaves behind: no identity, only the flag.
    pub fn logged_out_tombstone() -> Self {
        Self {
            user_id: None,
            login_time: None,
            last_verified_time: None,
            explicitly_logged_out: true,
        }
    }

    /// The authenticated identity, if any. An empty `user_id` counts as
    /// absent; a session with no identity is never authenticated,
    /// regardless of its other flags.
    pub fn identity(&self) -> Option<&str> {
        match self.user_id.as_deref() {
            Some(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity().is_none()
    }

    /// Age of the session relative to `now`, when a login time exists.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.login_time.map(|t| now - t)
    }
}
