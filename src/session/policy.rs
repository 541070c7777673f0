// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Validation policy knobs.
//!
//! Three independent thresholds govern a session's life, with no hidden
//! coupling between them:
//!
//! - `max_session_age`: absolute ceiling; beyond it the session is
//!   cleared no matter how active the client is.
//! - `refresh_after`: idle window; an active session older than this
//!   gets its `login_time` slid forward, which keeps the absolute ceiling
//!   from hitting users who never go away.
//! - `verify_probability`: per-request chance of a live identity
//!   re-check, bounding provider load to roughly `p x request_rate`.
//!
//! `verify_timeout` bounds the live check; `verify_cooldown` optionally
//! suppresses re-checks shortly after a successful one, for callers that
//! want a deterministic load bound instead of pure sampling.

use chrono::Duration;

pub const DEFAULT_MAX_SESSION_AGE_SECS: i64 = 30 * 24 * 60 * 60;
pub const DEFAULT_REFRESH_AFTER_SECS: i64 = 60 * 60;
pub const DEFAULT_VERIFY_PROBABILITY: f64 = 0.25;
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 5;

/// Thresholds consulted by [`SessionValidator`](super::SessionValidator).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    /// Absolute session lifetime ceiling.
    pub max_session_age: Duration,

    /// Idle window after which `login_time` slides forward.
    pub refresh_after: Duration,

    /// Probability in `[0, 1]` that a request performs a live identity
    /// check.
    pub verify_probability: f64,

    /// Upper bound on the live identity call; elapsing counts as the
    /// provider being unavailable.
    pub verify_timeout: std::time::Duration,

    /// When set, a sampled request skips the live check if the last
    /// successful one happened within this window.
    pub verify_cooldown: Option<Duration>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_session_age: Duration::seconds(DEFAULT_MAX_SESSION_AGE_SECS),
            refresh_after: Duration::seconds(DEFAULT_REFRESH_AFTER_SECS),
            verify_probability: DEFAULT_VERIFY_PROBABILITY,
            verify_timeout: std::time::Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
            verify_cooldown: None,
        }
    }
}

impl ValidationPolicy {
    pub fn with_max_session_age(mut self, age: Duration) -> Self {
        self.max_session_age = age;
        self
    }

    pub fn with_refresh_after(mut self, window: Duration) -> Self {
        self.refresh_after = window;
        self
    }

    /// Set the sampling rate, clamped into `[0, 1]`.
    pub fn with_verify_probability(mut self, p: f64) -> Self {
        self.verify_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_verify_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn with_verify_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.verify_cooldown = cooldown;
        self
    }
}
