// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session-Scoped Storage
//!
//! Everything a session leaves on disk or in memory beyond its record:
//! uploaded artifacts, their metadata, and cached computed results,
//! plus the sweeper that removes whatever the active session is not
//! entitled to see.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   sessions.redb                 # session records (embedded redb)
//!   artifacts/
//!     {session_key}/
//!       {artifact_id}.meta.json   # ArtifactRecord (owner, timestamps)
//!       {artifact_id}.bin         # payload bytes
//! ```
//!
//! Session keys become directory names, so only keys accepted by
//! [`key_is_path_safe`] ever touch the filesystem. Metadata is written
//! atomically (temp file, then rename); a crash can leave an orphaned
//! `.tmp` at worst, never a half-written record.

pub mod artifacts;
pub mod paths;
pub mod result_cache;
pub mod sweeper;

pub use artifacts::{ArtifactError, ArtifactRecord, ArtifactResult, ArtifactStore};
pub use paths::{key_is_path_safe, ArtifactPaths};
pub use result_cache::{CachedResult, ResultCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use sweeper::{StaleArtifactSweeper, StaleReason, SweepReport};
