// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The warden: one handle wiring validation, sweeping, artifacts, and
//! the result cache together for a host application.
//!
//! Hosts construct a [`SessionWarden`] at startup and call
//! [`validate_request`](SessionWarden::validate_request) from their
//! request path. Everything downstream of a `Valid` verdict works with
//! the returned [`ActiveSession`], which is the only way to touch
//! artifacts or cached results; an unvalidated key cannot reach them.

use std::sync::Arc;

use crate::clock::{Clock, SampleSource, SystemClock};
use crate::config::WardenConfig;
use crate::session::{
    ActiveSession, SessionKey, SessionRecord, SessionStore, SessionStoreResult, SessionValidator,
    SessionVerdict, ValidationPolicy,
};
use crate::storage::{
    ArtifactRecord, ArtifactResult, ArtifactStore, CachedResult, ResultCache,
    StaleArtifactSweeper, SweepReport,
};
use crate::verifier::IdentityVerifier;

/// Facade over the session lifecycle machinery.
pub struct SessionWarden {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn IdentityVerifier>,
    validator: SessionValidator,
    sweeper: StaleArtifactSweeper,
    artifacts: ArtifactStore,
    cache: Arc<ResultCache>,
    clock: Arc<dyn Clock>,
}

impl SessionWarden {
    pub fn new(
        config: WardenConfig,
        store: Arc<dyn SessionStore>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let artifacts = ArtifactStore::new(config.artifact_root());
        let cache = Arc::new(ResultCache::new(config.cache_capacity, config.cache_ttl));
        let validator =
            SessionValidator::new(store.clone(), verifier.clone()).with_policy(config.policy);
        let sweeper =
            StaleArtifactSweeper::new(artifacts.clone(), store.clone(), cache.clone());

        Self {
            store,
            verifier,
            validator,
            sweeper,
            artifacts,
            cache,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock.clone();
        self.validator = self.validator.with_clock(clock);
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn SampleSource>) -> Self {
        self.validator = self.validator.with_sampler(sampler);
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        self.validator.policy()
    }

    // =========================================================================
    // Request Path
    // =========================================================================

    /// Validate the request's session, then sweep state the session is
    /// not entitled to. The request proceeds on the verdict alone; the
    /// sweep can only log, never fail the request.
    pub async fn validate_request(&self, key: &SessionKey) -> SessionVerdict {
        let verdict = self.validator.validate(key).await;

        let report = self.sweeper.sweep(key);
        if report.deleted > 0 || report.failed > 0 || report.cache_evicted > 0 {
            tracing::debug!(
                session_key = %key,
                deleted = report.deleted,
                failed = report.failed,
                cache_evicted = report.cache_evicted,
                "Sweep pass finished"
            );
        }

        verdict
    }

    /// Sweep on demand, outside the request path.
    pub fn sweep(&self, key: &SessionKey) -> SweepReport {
        self.sweeper.sweep(key)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Record a successful login under `key`.
    pub fn begin_session(
        &self,
        key: &SessionKey,
        user_id: &str,
    ) -> SessionStoreResult<ActiveSession> {
        let login_time = self.clock.now();
        self.store.put(key, &SessionRecord::new(user_id, login_time))?;
        tracing::info!(session_key = %key, user_id, "Session started");

        Ok(ActiveSession {
            key: key.clone(),
            user_id: user_id.to_string(),
            login_time,
        })
    }

    /// Log the session out: best-effort provider token revocation, purge
    /// of its artifacts and cached result, and a logout tombstone in
    /// place of the record. Returns the user that was signed in, if any.
    pub async fn end_session(&self, key: &SessionKey) -> SessionStoreResult<Option<String>> {
        let user_id = match self.store.get(key) {
            Ok(record) => record.and_then(|r| r.identity().map(str::to_string)),
            Err(e) => {
                tracing::warn!(session_key = %key, error = %e, "Session store unreadable during logout");
                None
            }
        };

        if let Some(user) = user_id.as_deref() {
            self.revoke_tokens(user).await;
        }

        if let Err(e) = self.artifacts.delete_session(key) {
            tracing::warn!(session_key = %key, error = %e, "Failed to remove artifacts during logout");
        }
        self.cache.invalidate(key.as_str());

        self.store.put(key, &SessionRecord::logged_out_tombstone())?;
        tracing::info!(
            session_key = %key,
            user_id = user_id.as_deref().unwrap_or("unknown"),
            reason = "explicit-logout",
            detail = "user-initiated",
            "Cleared session"
        );

        Ok(user_id)
    }

    /// Drop every stored session. Incident-response lever; nothing on
    /// the request path calls this.
    pub fn clear_all_sessions(&self) -> SessionStoreResult<usize> {
        let dropped = self.store.clear_all()?;
        tracing::warn!(dropped, "All sessions cleared");
        Ok(dropped)
    }

    async fn revoke_tokens(&self, user_id: &str) {
        let deadline = self.policy().verify_timeout;
        match tokio::time::timeout(deadline, self.verifier.revoke(user_id)).await {
            Ok(confirmed) => {
                tracing::info!(user_id, confirmed, "Requested provider token revocation");
            }
            Err(_) => {
                tracing::warn!(user_id, "Provider token revocation timed out");
            }
        }
    }

    // =========================================================================
    // Artifacts and Results
    // =========================================================================

    /// Store an upload for a validated session, replacing any previous
    /// upload the session had.
    pub fn save_artifact(
        &self,
        session: &ActiveSession,
        filename: &str,
        payload: &[u8],
    ) -> ArtifactResult<ArtifactRecord> {
        self.artifacts.save(
            &session.key,
            &session.user_id,
            filename,
            payload,
            self.clock.now(),
        )
    }

    pub fn list_artifacts(&self, session: &ActiveSession) -> ArtifactResult<Vec<ArtifactRecord>> {
        self.artifacts.list(&session.key)
    }

    pub fn read_artifact(&self, record: &ArtifactRecord) -> ArtifactResult<Vec<u8>> {
        self.artifacts.read_payload(record)
    }

    /// Cache a computed result for a validated session.
    pub fn cache_result(&self, session: &ActiveSession, value: serde_json::Value) {
        self.cache.put(
            session.key.as_str(),
            CachedResult {
                owner_user_id: session.user_id.clone(),
                produced_at: self.clock.now(),
                value,
            },
        );
    }

    /// A cached result is served back only to the login that produced
    /// it; anything else is dropped on sight.
    pub fn cached_result(&self, session: &ActiveSession) -> Option<serde_json::Value> {
        let cached = self.cache.get(session.key.as_str())?;
        if cached.owner_user_id != session.user_id || cached.produced_at < session.login_time {
            self.cache.invalidate(session.key.as_str());
            return None;
        }
        Some(cached.value)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn results(&self) -> &Arc<ResultCache> {
        &self.cache
    }
}
