// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stale artifact sweeper.
//!
//! Uploaded artifacts and cached results outlive the session that
//! produced them unless something removes them. The sweeper walks the
//! artifact root under the key of the session currently being served and
//! hard-deletes everything that session is not entitled to see:
//!
//! - artifacts stored under any other session key,
//! - artifacts created before the active session's login,
//! - artifacts whose owner logged out or no longer matches the active
//!   user, or whose session state is gone entirely.
//!
//! Sweeping is housekeeping on the request path: every failure is
//! logged and counted, none is propagated, and a second sweep over the
//! same state removes nothing.

use std::sync::Arc;

use crate::session::{SessionKey, SessionRecord, SessionStore};

use super::artifacts::{ArtifactRecord, ArtifactStore};
use super::result_cache::ResultCache;

// =============================================================================
// Classification
// =============================================================================

/// Why an artifact was judged stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Stored under a session key other than the one being served.
    ForeignSession,

    /// Created before the active session's current login.
    PredatesLogin,

    /// The owning session was explicitly logged out.
    OwnerLoggedOut,

    /// The active session is authenticated as a different user.
    OwnerMismatch,

    /// The owning session's record is gone or carries no login.
    OrphanedSession,
}

impl StaleReason {
    /// Coarse reason for state-clearing log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerLoggedOut => "explicit-logout",
            _ => "cross-session-stale",
        }
    }

    /// Finer-grained detail for diagnostics.
    pub fn detail(&self) -> &'static str {
        match self {
            Self::ForeignSession => "foreign-session",
            Self::PredatesLogin => "predates-login",
            Self::OwnerLoggedOut => "owner-logged-out",
            Self::OwnerMismatch => "owner-mismatch",
            Self::OrphanedSession => "orphaned-session",
        }
    }
}

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Artifact records examined.
    pub scanned: usize,

    /// Artifacts removed.
    pub deleted: usize,

    /// Artifacts kept for the active session.
    pub retained: usize,

    /// Removal attempts that failed (left in place for the next sweep).
    pub failed: usize,

    /// Cached results evicted alongside the artifacts.
    pub cache_evicted: usize,
}

// =============================================================================
// StaleArtifactSweeper
// =============================================================================

/// Removes artifacts and cached results the active session must not see.
pub struct StaleArtifactSweeper {
    artifacts: ArtifactStore,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<ResultCache>,
}

impl StaleArtifactSweeper {
    pub fn new(
        artifacts: ArtifactStore,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            artifacts,
            sessions,
            cache,
        }
    }

    /// Sweep on behalf of the session currently being served.
    ///
    /// Reads the active session's record itself so a sweep scheduled
    /// after validation sees any refresh the validator just wrote.
    pub fn sweep(&self, active_key: &SessionKey) -> SweepReport {
        let mut report = SweepReport::default();

        let active = match self.sessions.get(active_key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    session_key = %active_key,
                    error = %e,
                    "Session store unreadable during sweep, treating session as absent"
                );
                None
            }
        };

        let keys = match self.artifacts.session_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Artifact root unreadable, skipping sweep pass");
                Vec::new()
            }
        };

        for key in keys {
            if key != *active_key {
                self.sweep_foreign(&key, &mut report);
            } else {
                self.sweep_same_key(&key, active.as_ref(), &mut report);
            }
        }

        // Cached results follow the same entitlement rules. An anonymous
        // or absent active session is entitled to nothing.
        let (owner, login) = match active.as_ref() {
            Some(record) => (record.identity().unwrap_or_default(), record.login_time),
            None => ("", None),
        };
        report.cache_evicted = self.cache.evict_stale(active_key.as_str(), owner, login);

        report
    }

    /// Remove another session's artifact directory wholesale.
    fn sweep_foreign(&self, key: &SessionKey, report: &mut SweepReport) {
        match self.artifacts.list(key) {
            Ok(records) => {
                report.scanned += records.len();
                for record in &records {
                    log_swept(record, StaleReason::ForeignSession);
                }
            }
            Err(e) => {
                tracing::warn!(session_key = %key, error = %e, "Failed to list foreign artifacts");
            }
        }

        match self.artifacts.delete_session(key) {
            Ok(removed) => report.deleted += removed,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    session_key = %key,
                    error = %e,
                    "Failed to sweep foreign artifact directory"
                );
            }
        }
    }

    /// Classify the active session's own artifacts one by one.
    fn sweep_same_key(
        &self,
        key: &SessionKey,
        active: Option<&SessionRecord>,
        report: &mut SweepReport,
    ) {
        let records = match self.artifacts.list(key) {
            Ok(records) => records,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(session_key = %key, error = %e, "Failed to list session artifacts");
                return;
            }
        };

        report.scanned += records.len();
        for record in records {
            match classify(&record, active) {
                Some(reason) => match self.artifacts.delete(&record) {
                    Ok(_) => {
                        report.deleted += 1;
                        log_swept(&record, reason);
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            session_key = %key,
                            artifact_id = %record.artifact_id,
                            error = %e,
                            "Failed to sweep stale artifact"
                        );
                    }
                },
                None => report.retained += 1,
            }
        }
    }
}

/// Decide whether the active session may keep one of its own artifacts.
fn classify(record: &ArtifactRecord, active: Option<&SessionRecord>) -> Option<StaleReason> {
    let Some(session) = active else {
        return Some(StaleReason::OrphanedSession);
    };
    if session.explicitly_logged_out {
        return Some(StaleReason::OwnerLoggedOut);
    }
    let Some(user) = session.identity() else {
        return Some(StaleReason::OrphanedSession);
    };
    if record.owner_user_id != user {
        return Some(StaleReason::OwnerMismatch);
    }
    let Some(login) = session.login_time else {
        return Some(StaleReason::OrphanedSession);
    };
    if record.created_at < login {
        return Some(StaleReason::PredatesLogin);
    }
    None
}

fn log_swept(record: &ArtifactRecord, reason: StaleReason) {
    tracing::info!(
        session_key = %record.session_key,
        artifact_id = %record.artifact_id,
        owner_user_id = %record.owner_user_id,
        reason = reason.as_str(),
        detail = reason.detail(),
        "Swept stale artifact"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use crate::storage::result_cache::CachedResult;
    use chrono::{Duration, Utc};

    struct Fixture {
        sweeper: StaleArtifactSweeper,
        artifacts: ArtifactStore,
        store: Arc<MemorySessionStore>,
        cache: Arc<ResultCache>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let store = Arc::new(MemorySessionStore::new());
        let cache = Arc::new(ResultCache::default());
        let sweeper = StaleArtifactSweeper::new(
            artifacts.clone(),
            store.clone() as Arc<dyn SessionStore>,
            cache.clone(),
        );
        Fixture {
            sweeper,
            artifacts,
            store,
            cache,
            _dir: dir,
        }
    }

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s)
    }

    #[test]
    fn foreign_artifacts_are_swept_and_own_are_kept() {
        let f = fixture();
        let login = Utc::now();
        f.store.put(&key("active"), &SessionRecord::new("u1", login)).unwrap();

        f.artifacts
            .save(&key("active"), "u1", "mine.txt", b"keep", login + Duration::minutes(1))
            .unwrap();
        f.artifacts
            .save(&key("other"), "u2", "theirs.txt", b"drop", login)
            .unwrap();

        let report = f.sweeper.sweep(&key("active"));
        assert_eq!(report.scanned, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.failed, 0);

        assert_eq!(f.artifacts.session_keys().unwrap(), vec![key("active")]);
        assert_eq!(f.artifacts.list(&key("active")).unwrap().len(), 1);
    }

    #[test]
    fn sweeping_twice_removes_nothing_new() {
        let f = fixture();
        let login = Utc::now();
        f.store.put(&key("active"), &SessionRecord::new("u1", login)).unwrap();

        f.artifacts
            .save(&key("active"), "u1", "mine.txt", b"keep", login + Duration::minutes(1))
            .unwrap();
        f.artifacts
            .save(&key("other"), "u2", "theirs.txt", b"drop", login)
            .unwrap();

        let first = f.sweeper.sweep(&key("active"));
        assert_eq!(first.deleted, 1);

        let second = f.sweeper.sweep(&key("active"));
        assert_eq!(second.deleted, 0);
        assert_eq!(second.failed, 0);
        assert_eq!(second.retained, 1);
    }

    #[test]
    fn artifacts_from_before_the_current_login_are_swept() {
        let f = fixture();
        let login = Utc::now();
        f.store.put(&key("s1"), &SessionRecord::new("u1", login)).unwrap();

        f.artifacts
            .save(&key("s1"), "u1", "old.txt", b"x", login - Duration::hours(2))
            .unwrap();

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report.deleted, 1);
        assert_eq!(report.retained, 0);
        assert!(f.artifacts.list(&key("s1")).unwrap().is_empty());
    }

    #[test]
    fn artifacts_owned_by_a_different_user_are_swept() {
        let f = fixture();
        let login = Utc::now();
        f.store.put(&key("s1"), &SessionRecord::new("current-user", login)).unwrap();

        f.artifacts
            .save(
                &key("s1"),
                "previous-user",
                "theirs.txt",
                b"x",
                login + Duration::minutes(1),
            )
            .unwrap();

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report.deleted, 1);
    }

    #[test]
    fn logged_out_sessions_lose_their_artifacts() {
        let f = fixture();
        f.store
            .put(&key("s1"), &SessionRecord::logged_out_tombstone())
            .unwrap();

        f.artifacts
            .save(&key("s1"), "u1", "leftover.txt", b"x", Utc::now())
            .unwrap();

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report.deleted, 1);
        assert!(f.artifacts.list(&key("s1")).unwrap().is_empty());
    }

    #[test]
    fn artifacts_without_session_state_are_swept() {
        let f = fixture();
        // No record in the store at all.
        f.artifacts
            .save(&key("ghost"), "u1", "orphan.txt", b"x", Utc::now())
            .unwrap();

        let report = f.sweeper.sweep(&key("ghost"));
        assert_eq!(report.deleted, 1);
        assert_eq!(report.retained, 0);
    }

    #[test]
    fn session_without_login_time_keeps_nothing() {
        let f = fixture();
        let mut record = SessionRecord::new("u1", Utc::now());
        record.login_time = None;
        f.store.put(&key("s1"), &record).unwrap();

        f.artifacts
            .save(&key("s1"), "u1", "f.txt", b"x", Utc::now())
            .unwrap();

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report.deleted, 1);
    }

    #[test]
    fn empty_artifact_root_sweeps_cleanly() {
        let f = fixture();
        f.store.put(&key("s1"), &SessionRecord::new("u1", Utc::now())).unwrap();

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn cached_results_are_evicted_with_the_artifacts() {
        let f = fixture();
        let login = Utc::now();
        f.store.put(&key("active"), &SessionRecord::new("u1", login)).unwrap();

        let fresh = CachedResult {
            owner_user_id: "u1".to_string(),
            produced_at: login + Duration::minutes(1),
            value: serde_json::json!(1),
        };
        let foreign = CachedResult {
            owner_user_id: "u2".to_string(),
            produced_at: login + Duration::minutes(1),
            value: serde_json::json!(2),
        };
        f.cache.put("active", fresh);
        f.cache.put("other", foreign);

        let report = f.sweeper.sweep(&key("active"));
        assert_eq!(report.cache_evicted, 1);
        assert!(f.cache.get("active").is_some());
        assert!(f.cache.get("other").is_none());
    }

    #[test]
    fn anonymous_active_session_loses_cached_results() {
        let f = fixture();
        f.cache.put(
            "s1",
            CachedResult {
                owner_user_id: "u1".to_string(),
                produced_at: Utc::now(),
                value: serde_json::json!(1),
            },
        );

        let report = f.sweeper.sweep(&key("s1"));
        assert_eq!(report.cache_evicted, 1);
        assert!(f.cache.is_empty());
    }
}
