// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state: records, stores, policy, and the per-request
//! validator.
//!
//! A session is a key → attributes row plus the rules for deciding
//! whether that row still names a trustworthy login. The validator owns
//! every transition out of the authenticated state except explicit
//! logout, which belongs to the host (see
//! [`SessionWarden`](crate::warden::SessionWarden)).

pub mod policy;
pub mod record;
pub mod store;
pub mod validator;

pub use policy::{
    ValidationPolicy, DEFAULT_MAX_SESSION_AGE_SECS, DEFAULT_REFRESH_AFTER_SECS,
    DEFAULT_VERIFY_PROBABILITY, DEFAULT_VERIFY_TIMEOUT_SECS,
};
pub use record::{SessionKey, SessionRecord};
pub use store::{
    MemorySessionStore, RedbSessionStore, SessionStore, SessionStoreError, SessionStoreResult,
};
pub use validator::{ActiveSession, RejectionReason, SessionValidator, SessionVerdict};
