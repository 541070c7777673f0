// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Warden - Session Validation and Stale-State Lifecycle
//!
//! This crate decides, on every request, whether a session is still
//! trustworthy, and removes the artifacts and cached results a session
//! is no longer entitled to. Hosts embed a `SessionWarden`, call it from
//! their request path, and branch on the verdict.
//!
//! ## Modules
//!
//! - `clock` - Injectable time and randomness sources
//! - `config` - Environment-driven configuration
//! - `session` - Session records, stores, policy, and the validator
//! - `storage` - Uploaded artifacts, cached results, and the sweeper
//! - `verifier` - Identity provider adapters
//! - `warden` - The facade hosts embed

pub mod clock;
pub mod config;
pub mod session;
pub mod storage;
pub mod verifier;
pub mod warden;
