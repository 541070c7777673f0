// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Verifier Module
//!
//! Thin adapter contract for the external authentication provider: given a
//! user identifier, confirm whether that account still exists and is in
//! good standing.
//!
//! ## Contract
//!
//! - `verify` is a **total** call. Provider-specific failures (HTTP
//!   errors, timeouts, unparseable ids) are folded into exactly three
//!   outcomes, `Valid`, `Invalid`, or `Unavailable`, and never escape as
//!   panics or errors into request-handling code.
//! - The validator treats `Invalid` and `Unavailable` identically: both
//!   clear the session. Trusting a stale, unverifiable session is riskier
//!   than forcing a re-login, so there is no retry-then-trust path. The
//!   split between the two exists for logging only.
//! - `revoke` asks the provider to drop its refresh tokens for a user.
//!   Best-effort; callers proceed regardless of the answer.

pub mod http;

pub use http::HttpIdentityVerifier;

use async_trait::async_trait;

/// Why the provider rejected an identity outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The account no longer exists.
    NotFound,
    /// The account exists but has been disabled or revoked.
    Disabled,
    /// The identifier cannot name an account at this provider.
    MalformedId,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::NotFound => "not-found",
            InvalidReason::Disabled => "disabled",
            InvalidReason::MalformedId => "malformed-id",
        }
    }
}

/// Why the provider could not answer at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The call exceeded its deadline.
    Timeout,
    /// Connection-level failure before a response arrived.
    Transport,
    /// The provider answered with a server-side error.
    Provider,
    /// Failure in the caller's own stack while checking (session store
    /// I/O and the like). Never produced by provider adapters.
    Internal,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::Timeout => "provider-timeout",
            UnavailableReason::Transport => "provider-transport",
            UnavailableReason::Provider => "provider-error",
            UnavailableReason::Internal => "internal-error",
        }
    }
}

/// Outcome of a live identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid(InvalidReason),
    Unavailable(UnavailableReason),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }

    /// Stable string for structured logs.
    pub fn reason_str(&self) -> &'static str {
        match self {
            Verification::Valid => "valid",
            Verification::Invalid(reason) => reason.as_str(),
            Verification::Unavailable(reason) => reason.as_str(),
        }
    }
}

/// External system of record for whether a user id is currently valid.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Confirm `user_id` against the provider. Safe to call with
    /// arbitrary or unknown ids.
    async fn verify(&self, user_id: &str) -> Verification;

    /// Ask the provider to revoke its tokens for `user_id`. Returns
    /// whether the provider confirmed the revocation.
    async fn revoke(&self, user_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(Verification::Valid.reason_str(), "valid");
        assert_eq!(
            Verification::Invalid(InvalidReason::NotFound).reason_str(),
            "not-found"
        );
        assert_eq!(
            Verification::Invalid(InvalidReason::Disabled).reason_str(),
            "disabled"
        );
        assert_eq!(
            Verification::Unavailable(UnavailableReason::Timeout).reason_str(),
            "provider-timeout"
        );
    }

    #[test]
    fn only_valid_is_valid() {
        assert!(Verification::Valid.is_valid());
        assert!(!Verification::Invalid(InvalidReason::MalformedId).is_valid());
        assert!(!Verification::Unavailable(UnavailableReason::Provider).is_valid());
    }
}
