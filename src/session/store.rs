// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session store accessors backed by redb (server-side) or memory.
//!
//! ## Table Layout
//!
//! - `sessions`: session key → serialized [`SessionRecord`] (JSON bytes)
//!
//! Clearing a session means removing the row, not blanking fields; a key
//! with no row has no attributes at all. Writes are last-write-wins: the
//! validated fields advance monotonically and re-apply idempotently, so
//! no cross-request locking is required.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::record::{SessionKey, SessionRecord};

/// Primary table: session key → serialized SessionRecord (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type SessionStoreResult<T> = Result<T, SessionStoreError>;

// =============================================================================
// Accessor Trait
// =============================================================================

/// Key → attributes accessor shared by the validator, sweeper, and host.
///
/// Object-safe and synchronous: both backends complete in-process without
/// awaiting, so callers hold an `Arc<dyn SessionStore>`.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &SessionKey) -> SessionStoreResult<Option<SessionRecord>>;

    /// Insert or replace the record for a key.
    fn put(&self, key: &SessionKey, record: &SessionRecord) -> SessionStoreResult<()>;

    /// Remove all attributes for a key. Returns whether the key existed.
    fn clear(&self, key: &SessionKey) -> SessionStoreResult<bool>;

    /// Remove every session. Returns how many were dropped.
    ///
    /// Operational escape hatch for incident response; request handling
    /// never calls this.
    fn clear_all(&self) -> SessionStoreResult<usize>;

    /// Number of stored sessions (tombstones included).
    fn len(&self) -> SessionStoreResult<usize>;

    fn is_empty(&self) -> SessionStoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// RedbSessionStore
// =============================================================================

/// Server-backed session store on an embedded redb database.
pub struct RedbSessionStore {
    db: Database,
}

impl RedbSessionStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> SessionStoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn all_keys(&self) -> SessionStoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            keys.push(entry.0.value().to_string());
        }
        Ok(keys)
    }
}

impl SessionStore for RedbSessionStore {
    fn get(&self, key: &SessionKey) -> SessionStoreResult<Option<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        match table.get(key.as_str())? {
            Some(value) => {
                let record: SessionRecord = serde_json::from_slice(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &SessionKey, record: &SessionRecord) -> SessionStoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn clear(&self, key: &SessionKey) -> SessionStoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn clear_all(&self) -> SessionStoreResult<usize> {
        let keys = self.all_keys()?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(keys.len())
    }

    fn len(&self) -> SessionStoreResult<usize> {
        Ok(self.all_keys()?.len())
    }
}

// =============================================================================
// MemorySessionStore
// =============================================================================

/// In-memory store: the cookie-session analogue and the deterministic
/// test double.
///
/// Tracks how many read and write operations it has served, which makes
/// "validate performed no further store writes" directly assertable.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total mutating calls (`put`, `clear`, `clear_all`) served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &SessionKey) -> SessionStoreResult<Option<SessionRecord>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock().get(key.as_str()).cloned())
    }

    fn put(&self, key: &SessionKey, record: &SessionRecord) -> SessionStoreResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key.as_str().to_string(), record.clone());
        Ok(())
    }

    fn clear(&self, key: &SessionKey) -> SessionStoreResult<bool> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock().remove(key.as_str()).is_some())
    }

    fn clear_all(&self) -> SessionStoreResult<usize> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.lock();
        let dropped = sessions.len();
        sessions.clear();
        Ok(dropped)
    }

    fn len(&self) -> SessionStoreResult<usize> {
        Ok(self.lock().len())
    }
}
