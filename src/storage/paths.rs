// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the artifact storage layout.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Default root directory for per-session artifact storage.
pub const DEFAULT_ARTIFACT_ROOT: &str = "/data/artifacts";

/// Longest session key accepted as a directory name.
const MAX_KEY_LENGTH: usize = 255;

/// Whether a session key can safely name a directory.
///
/// Cookie-token characters only: no separators, no relative path
/// components. Keys failing this never touch the filesystem.
pub fn key_is_path_safe(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Path utilities for the artifact filesystem.
///
/// ## Storage Layout
///
/// ```text
/// {root}/
///   {session_key}/
///     {artifact_id}.meta.json  # ArtifactRecord metadata
///     {artifact_id}.bin        # Payload bytes
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_ROOT)
    }
}

impl ArtifactPaths {
    /// Create a new ArtifactPaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory holding one subdirectory per session key.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a specific session's artifacts.
    pub fn session_dir(&self, session_key: &str) -> PathBuf {
        self.root.join(session_key)
    }

    /// Path to an artifact's metadata file.
    pub fn artifact_meta(&self, session_key: &str, artifact_id: &Uuid) -> PathBuf {
        self.session_dir(session_key)
            .join(format!("{artifact_id}.meta.json"))
    }

    /// Path to an artifact's payload file.
    pub fn artifact_payload(&self, session_key: &str, artifact_id: &Uuid) -> PathBuf {
        self.session_dir(session_key)
            .join(format!("{artifact_id}.bin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_artifact_root() {
        let paths = ArtifactPaths::default();
        assert_eq!(paths.root(), Path::new("/data/artifacts"));
    }

    #[test]
    fn custom_root_for_testing() {
        let paths = ArtifactPaths::new("/tmp/test-artifacts");
        assert_eq!(paths.root(), Path::new("/tmp/test-artifacts"));
        assert_eq!(
            paths.session_dir("sess-1"),
            PathBuf::from("/tmp/test-artifacts/sess-1")
        );
    }

    #[test]
    fn artifact_paths_are_correct() {
        let paths = ArtifactPaths::new("/data/artifacts");
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            paths.artifact_meta("sess-1", &id),
            PathBuf::from(
                "/data/artifacts/sess-1/67e55044-10b1-426f-9247-bb680e5fe0c8.meta.json"
            )
        );
        assert_eq!(
            paths.artifact_payload("sess-1", &id),
            PathBuf::from("/data/artifacts/sess-1/67e55044-10b1-426f-9247-bb680e5fe0c8.bin")
        );
    }

    #[test]
    fn cookie_token_keys_are_path_safe() {
        assert!(key_is_path_safe("eyJhbGciOi.signature-part_1~x"));
        assert!(key_is_path_safe("plain-session-key"));
    }

    #[test]
    fn separator_and_relative_keys_are_rejected() {
        assert!(!key_is_path_safe(""));
        assert!(!key_is_path_safe("."));
        assert!(!key_is_path_safe(".."));
        assert!(!key_is_path_safe("a/b"));
        assert!(!key_is_path_safe("a\\b"));
        assert!(!key_is_path_safe("key with spaces"));
        assert!(!key_is_path_safe(&"x".repeat(256)));
    }
}
