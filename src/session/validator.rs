// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request session validation.
//!
//! The validator is consulted for every inbound request and decides
//! whether the session behind the request's key is still trustworthy.
//! Callers only branch on [`SessionVerdict::is_valid`]; the rejection
//! reasons feed structured logs and are never surfaced to the end user,
//! so responses cannot leak whether an account exists.
//!
//! ## Algorithm
//!
//! Checks run in order and short-circuit on the first failure:
//!
//! 1. A missing record, a logout tombstone, or a record with no identity
//!    is the anonymous baseline (`Absent`). Nothing is mutated.
//! 2. Sessions older than the absolute ceiling are cleared and rejected
//!    (`Expired`), bounding exposure from an indefinitely-trusted cookie.
//! 3. With probability `verify_probability`, the identity is re-checked
//!    live against the provider, under `verify_timeout`. Success stamps
//!    `last_verified_time`; any failure (account gone, provider down,
//!    deadline elapsed) clears the session (`Revoked`/`Unverifiable`).
//!    A failed check is never retried within the request.
//! 4. Independently, sessions idle past `refresh_after` get `login_time`
//!    slid forward, so active users never hit the absolute ceiling.
//! 5. Dirty records are persisted exactly once per request.
//!
//! Every clear emits one structured log event with a stable `reason`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SampleSource, SystemClock, ThreadRngSampler};
use crate::verifier::{IdentityVerifier, InvalidReason, UnavailableReason, Verification};

use super::policy::ValidationPolicy;
use super::record::SessionKey;
use super::store::SessionStore;

/// Why a session failed validation. Collapses to "not authenticated" for
/// callers; the distinction exists for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No record, no identity, or a logout tombstone. The anonymous
    /// baseline state, not an error.
    Absent,
    /// Absolute age ceiling exceeded.
    Expired,
    /// The provider confirmed the account is gone or revoked.
    Revoked(InvalidReason),
    /// Validity could not be established (provider unreachable, deadline
    /// elapsed, or an internal fault).
    Unverifiable(UnavailableReason),
}

impl RejectionReason {
    /// Coarse reason for structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Absent => "session-absent",
            RejectionReason::Expired => "age-expired",
            RejectionReason::Revoked(_) | RejectionReason::Unverifiable(_) => {
                "verification-failed"
            }
        }
    }

    /// Finer-grained detail for diagnostics.
    pub fn detail(&self) -> &'static str {
        match self {
            RejectionReason::Absent => "no-identity",
            RejectionReason::Expired => "max-age-exceeded",
            RejectionReason::Revoked(reason) => reason.as_str(),
            RejectionReason::Unverifiable(reason) => reason.as_str(),
        }
    }
}

/// Trusted identity handed to the rest of the request after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub key: SessionKey,
    pub user_id: String,
    /// Login time after any idle refresh performed this request.
    pub login_time: DateTime<Utc>,
}

/// Outcome of validating one request's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
    Valid(ActiveSession),
    Invalid(RejectionReason),
}

impl SessionVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionVerdict::Valid(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            SessionVerdict::Valid(active) => Some(active),
            SessionVerdict::Invalid(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            SessionVerdict::Valid(_) => None,
            SessionVerdict::Invalid(reason) => Some(*reason),
        }
    }
}

/// The session validation state machine.
///
/// Holds no per-request state and no long-lived locks; every dependency
/// is an explicit, injected handle. Concurrent validations of the same
/// key may both draw a live check — the check is idempotent and results
/// are deliberately not shared across calls.
pub struct SessionValidator {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn IdentityVerifier>,
    policy: ValidationPolicy,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn SampleSource>,
}

impl SessionValidator {
    /// Create a validator with the default policy, system clock, and
    /// thread-local RNG sampling.
    pub fn new(store: Arc<dyn SessionStore>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            store,
            verifier,
            policy: ValidationPolicy::default(),
            clock: Arc::new(SystemClock),
            sampler: Arc::new(ThreadRngSampler),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn SampleSource>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate the session behind `key`.
    ///
    /// Infallible by construction: internal faults are normalized to an
    /// `Unverifiable` rejection instead of escaping into request code.
    pub async fn validate(&self, key: &SessionKey) -> SessionVerdict {
        let record = match self.store.get(key) {
            Ok(Some(record)) => record,
            Ok(None) => return SessionVerdict::Invalid(RejectionReason::Absent),
            Err(e) => {
                tracing::error!(session_key = %key, error = %e, "Session store read failed");
                let reason = RejectionReason::Unverifiable(UnavailableReason::Internal);
                self.clear_session(key, reason, None);
                return SessionVerdict::Invalid(reason);
            }
        };

        // Tombstones and identity-less records are anonymous; they carry
        // nothing worth clearing and are left untouched.
        if record.explicitly_logged_out {
            return SessionVerdict::Invalid(RejectionReason::Absent);
        }
        let user_id = match record.identity() {
            Some(id) => id.to_string(),
            None => return SessionVerdict::Invalid(RejectionReason::Absent),
        };

        let now = self.clock.now();

        // An identity without a login time is malformed; fail closed.
        let login_time = match record.login_time {
            Some(t) => t,
            None => {
                self.clear_session(key, RejectionReason::Expired, Some(&user_id));
                return SessionVerdict::Invalid(RejectionReason::Expired);
            }
        };

        if now - login_time > self.policy.max_session_age {
            self.clear_session(key, RejectionReason::Expired, Some(&user_id));
            return SessionVerdict::Invalid(RejectionReason::Expired);
        }

        let mut record = record;
        let mut dirty = false;

        if self.should_verify(record.last_verified_time, now) {
            match self.verify_with_deadline(&user_id).await {
                Verification::Valid => {
                    record.last_verified_time = Some(now);
                    dirty = true;
                }
                Verification::Invalid(why) => {
                    self.revoke_tokens(&user_id).await;
                    let reason = RejectionReason::Revoked(why);
                    self.clear_session(key, reason, Some(&user_id));
                    return SessionVerdict::Invalid(reason);
                }
                Verification::Unavailable(why) => {
                    let reason = RejectionReason::Unverifiable(why);
                    self.clear_session(key, reason, Some(&user_id));
                    return SessionVerdict::Invalid(reason);
                }
            }
        }

        // Idle refresh slides the absolute-age window forward for active
        // users; runs whether or not this request also re-verified.
        if now - login_time > self.policy.refresh_after {
            record.login_time = Some(now);
            dirty = true;
        }

        if dirty {
            // Last-write-wins: a lost refresh re-applies on the next
            // request, so a persist failure does not flip the verdict.
            if let Err(e) = self.store.put(key, &record) {
                tracing::warn!(
                    session_key = %key,
                    user_id,
                    error = %e,
                    "Failed to persist refreshed session"
                );
            }
        }

        SessionVerdict::Valid(ActiveSession {
            key: key.clone(),
            user_id,
            login_time: record.login_time.unwrap_or(login_time),
        })
    }

    /// Whether this request performs a live identity check.
    fn should_verify(&self, last_verified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if let (Some(cooldown), Some(last)) = (self.policy.verify_cooldown, last_verified) {
            if now - last < cooldown {
                return false;
            }
        }
        self.sampler.sample() < self.policy.verify_probability
    }

    async fn verify_with_deadline(&self, user_id: &str) -> Verification {
        match tokio::time::timeout(self.policy.verify_timeout, self.verifier.verify(user_id)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Verification::Unavailable(UnavailableReason::Timeout),
        }
    }

    /// Best-effort provider-token revocation after a confirmed-invalid
    /// identity, bounded by the same deadline as the check itself.
    async fn revoke_tokens(&self, user_id: &str) {
        match tokio::time::timeout(self.policy.verify_timeout, self.verifier.revoke(user_id)).await
        {
            Ok(confirmed) => {
                tracing::info!(user_id, confirmed, "Requested provider token revocation");
            }
            Err(_) => {
                tracing::warn!(user_id, "Provider token revocation timed out");
            }
        }
    }

    fn clear_session(&self, key: &SessionKey, reason: RejectionReason, user_id: Option<&str>) {
        match self.store.clear(key) {
            Ok(_) => {
                tracing::info!(
                    session_key = %key,
                    user_id = user_id.unwrap_or("unknown"),
                    reason = reason.as_str(),
                    detail = reason.detail(),
                    "Cleared session"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_key = %key,
                    user_id = user_id.unwrap_or("unknown"),
                    reason = reason.as_str(),
                    error = %e,
                    "Failed to clear session"
                );
            }
        }
    }
}
