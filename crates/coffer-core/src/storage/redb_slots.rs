//! # redb-backed Slot Storage
//!
//! The on-device slot store, kept in a single redb database file.
//!
//! redb gives the slots:
//! - ACID writes (a slot is either the old value or the new one)
//! - Crash safety (copy-on-write B-trees)
//! - Zero configuration
//!
//! The quota is enforced inside the write transaction, so a rejected write
//! leaves the previous value in place.

use super::{SlotStore, check_quota, slot_size};
use crate::{CofferError, primitives};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for slots: key string -> value string
const SLOTS: TableDefinition<&str, &str> = TableDefinition::new("slots");

fn io_err(e: impl std::fmt::Display) -> CofferError {
    CofferError::IoError(e.to_string())
}

/// A disk-backed slot store using redb.
pub struct RedbSlots {
    /// The redb database handle.
    db: Database,
    /// Byte quota across all slots.
    quota: u64,
}

impl std::fmt::Debug for RedbSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSlots")
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl RedbSlots {
    /// Open or create a slot database at the given path with the default quota.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CofferError> {
        Self::open_with_quota(path, primitives::DEFAULT_SLOT_QUOTA_BYTES)
    }

    /// Open or create a slot database with an explicit byte quota.
    pub fn open_with_quota(path: impl AsRef<Path>, quota: u64) -> Result<Self, CofferError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize the table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(SLOTS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db, quota })
    }

    /// All slot keys, in key order. Shown by `coffer status`.
    pub fn keys(&self) -> Result<Vec<String>, CofferError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SLOTS).map_err(io_err)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl SlotStore for RedbSlots {
    fn read(&self, key: &str) -> Result<Option<String>, CofferError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SLOTS).map_err(io_err)?;
        let value = table
            .get(key)
            .map_err(io_err)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CofferError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SLOTS).map_err(io_err)?;

            let mut used_by_others: u64 = 0;
            for entry in table.iter().map_err(io_err)? {
                let (k, v) = entry.map_err(io_err)?;
                if k.value() != key {
                    used_by_others = used_by_others.saturating_add(slot_size(k.value(), v.value()));
                }
            }
            check_quota(used_by_others, key, value, self.quota)?;

            table.insert(key, value).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CofferError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SLOTS).map_err(io_err)?;
            table.remove(key).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn quota(&self) -> u64 {
        self.quota
    }
}

// =============================================================================
// TESTS
// =============================================================================
