// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-session artifact storage (uploads and their metadata).
//!
//! Each session key owns at most one upload context: saving a new
//! artifact replaces whatever the session had before. Metadata and
//! payload live side by side so a directory scan can always attribute
//! payload bytes to an owning session and user.
//!
//! Deletes treat missing files as already done — sweeping the same
//! artifact twice, or racing another request's sweep, is not an error.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionKey;

use super::paths::{key_is_path_safe, ArtifactPaths};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session key unusable as a storage path: {0:?}")]
    UnsafeSessionKey(String),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

// =============================================================================
// ArtifactRecord
// =============================================================================

/// Metadata stored beside every uploaded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub artifact_id: Uuid,

    /// Session key the upload arrived under.
    pub session_key: SessionKey,

    /// User authenticated at upload time. Lets the sweeper evict content
    /// when the same cookie substrate changes hands between accounts.
    pub owner_user_id: String,

    /// Client-supplied name, metadata only; never used as a path.
    pub filename: String,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,

    /// Payload file name inside the session directory.
    pub payload_ref: String,
}

// =============================================================================
// ArtifactStore
// =============================================================================

/// Filesystem-backed store for per-session artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            paths: ArtifactPaths::new(root),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn checked_key<'k>(&self, key: &'k SessionKey) -> ArtifactResult<&'k str> {
        if key_is_path_safe(key.as_str()) {
            Ok(key.as_str())
        } else {
            Err(ArtifactError::UnsafeSessionKey(key.as_str().to_string()))
        }
    }

    /// Save an upload for a session, replacing any artifacts the session
    /// already has. Returns the stored record.
    pub fn save(
        &self,
        key: &SessionKey,
        owner_user_id: &str,
        filename: &str,
        payload: &[u8],
        created_at: DateTime<Utc>,
    ) -> ArtifactResult<ArtifactRecord> {
        let key_str = self.checked_key(key)?;

        // One upload context per session
        self.delete_session(key)?;

        let dir = self.paths.session_dir(key_str);
        fs::create_dir_all(&dir)?;

        let artifact_id = Uuid::new_v4();
        let record = ArtifactRecord {
            artifact_id,
            session_key: key.clone(),
            owner_user_id: owner_user_id.to_string(),
            filename: filename.to_string(),
            created_at,
            payload_ref: format!("{artifact_id}.bin"),
        };

        write_atomic(&self.paths.artifact_payload(key_str, &artifact_id), payload)?;
        write_atomic(
            &self.paths.artifact_meta(key_str, &artifact_id),
            serde_json::to_string_pretty(&record)?.as_bytes(),
        )?;

        Ok(record)
    }

    /// List a session's artifacts.
    ///
    /// Metadata that no longer parses cannot be attributed to anyone, so
    /// the entry is removed on sight rather than served.
    pub fn list(&self, key: &SessionKey) -> ArtifactResult<Vec<ArtifactRecord>> {
        let key_str = self.checked_key(key)?;
        let dir = self.paths.session_dir(key_str);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(id_str) = name.strip_suffix(".meta.json") else {
                continue;
            };

            let parsed = fs::read_to_string(entry.path())
                .map_err(ArtifactError::from)
                .and_then(|data| Ok(serde_json::from_str::<ArtifactRecord>(&data)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        session_key = %key,
                        artifact = %name,
                        error = %e,
                        reason = "cross-session-stale",
                        detail = "unreadable-metadata",
                        "Removing unattributable artifact"
                    );
                    remove_if_present(&entry.path());
                    if let Ok(id) = Uuid::parse_str(id_str) {
                        remove_if_present(&self.paths.artifact_payload(key_str, &id));
                    }
                }
            }
        }

        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Read an artifact's payload bytes.
    pub fn read_payload(&self, record: &ArtifactRecord) -> ArtifactResult<Vec<u8>> {
        let key_str = self.checked_key(&record.session_key)?;
        let path = self.paths.session_dir(key_str).join(&record.payload_ref);
        Ok(fs::read(path)?)
    }

    /// Delete one artifact (metadata and payload). Missing files are a
    /// no-op; returns whether anything was actually removed.
    pub fn delete(&self, record: &ArtifactRecord) -> ArtifactResult<bool> {
        let key_str = self.checked_key(&record.session_key)?;

        let meta_gone = remove_checked(&self.paths.artifact_meta(key_str, &record.artifact_id))?;
        let payload_gone =
            remove_checked(&self.paths.artifact_payload(key_str, &record.artifact_id))?;
        Ok(meta_gone || payload_gone)
    }

    /// Delete every artifact a session owns. Returns how many artifacts
    /// were removed; a missing directory counts as zero.
    pub fn delete_session(&self, key: &SessionKey) -> ArtifactResult<usize> {
        let key_str = self.checked_key(key)?;
        let dir = self.paths.session_dir(key_str);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let removed = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".meta.json"))
            .count();

        fs::remove_dir_all(&dir)?;
        Ok(removed)
    }

    /// Session keys that currently have artifact directories.
    pub fn session_keys(&self) -> ArtifactResult<Vec<SessionKey>> {
        let entries = match fs::read_dir(self.paths.root()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                keys.push(SessionKey::new(entry.file_name().to_string_lossy()));
            }
        }
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}

/// Write to a temp file first, then rename for atomicity.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Remove a file, treating "already gone" as done.
fn remove_checked(path: &Path) -> ArtifactResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact file");
        }
    }
}
