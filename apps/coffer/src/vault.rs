//! # Vault
//!
//! The state holder: owns the live document and the coordinator, and is the
//! only way to mutate the document. Every mutation performs exactly one save
//! and waits for it to settle before returning.
//!
//! A `Vault` is a plain value. Callers that share it across tasks use
//! [`SharedVault`], whose mutex is the single-writer guarantee for the document.

use crate::coordinator::{LoadReport, PersistenceCoordinator, SaveOutcome};
use crate::remote::{RemoteAddress, RemoteEndpoint};
use coffer_core::{
    Category, CategoryDomain, CofferError, Collection, ImportRejection, PreparedImport, Record,
    SlotStore, SnapshotFile, StateDocument, export_snapshot, import_into,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A vault shared between tasks.
pub type SharedVault<S, R> = Arc<Mutex<Vault<S, R>>>;

/// Result of a mutation that changed the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub saved: SaveOutcome,
}

/// Result of `connect_remote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub address: RemoteAddress,
    /// Why the reachability read failed, if it did. The identifier is stored anyway.
    pub reach_failure: Option<String>,
    /// The migrating save, run only when the endpoint answered.
    pub migrated: Option<SaveOutcome>,
}

/// Live document plus the coordinator that persists it.
pub struct Vault<S, R> {
    document: StateDocument,
    coordinator: PersistenceCoordinator<S, R>,
}

impl<S: SlotStore, R: RemoteEndpoint> Vault<S, R> {
    /// Load the document through the coordinator and take ownership of both.
    pub async fn open(coordinator: PersistenceCoordinator<S, R>) -> (Self, LoadReport) {
        let report = coordinator.load().await;
        let vault = Self {
            document: report.document.clone(),
            coordinator,
        };
        (vault, report)
    }

    /// Wrap for sharing across tasks.
    pub fn shared(self) -> SharedVault<S, R> {
        Arc::new(Mutex::new(self))
    }

    /// Read-only view for renderers.
    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    pub fn coordinator(&self) -> &PersistenceCoordinator<S, R> {
        &self.coordinator
    }

    /// Persist the current document.
    pub async fn save(&self) -> SaveOutcome {
        self.coordinator.save(&self.document).await
    }

    async fn commit<T>(&self, value: T) -> Committed<T> {
        let saved = self.save().await;
        Committed { value, saved }
    }

    // -------------------------------------------------------------------------
    // RECORDS
    // -------------------------------------------------------------------------

    /// Insert or replace a record. Returns the record id.
    pub async fn upsert_record(
        &mut self,
        collection: Collection,
        record: Record,
    ) -> Committed<String> {
        let id = self.document.upsert_record(collection, record);
        self.commit(id).await
    }

    /// Delete a record by id. `None` (and no save) when no record matched.
    pub async fn delete_record(
        &mut self,
        collection: Collection,
        id: &str,
    ) -> Option<SaveOutcome> {
        if self.document.remove_record(collection, id) {
            Some(self.save().await)
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // CATEGORIES
    // -------------------------------------------------------------------------

    pub async fn add_category(
        &mut self,
        domain: CategoryDomain,
        category: Category,
    ) -> Result<SaveOutcome, CofferError> {
        self.document.add_category(domain, category)?;
        Ok(self.save().await)
    }

    /// Remove a category; records referencing it keep the dangling id.
    pub async fn remove_category(
        &mut self,
        domain: CategoryDomain,
        id: &str,
    ) -> Option<SaveOutcome> {
        if self.document.remove_category(domain, id) {
            Some(self.save().await)
        } else {
            None
        }
    }

    /// Replace everything with the built-in defaults.
    pub async fn reset(&mut self) -> SaveOutcome {
        self.document = StateDocument::new();
        self.save().await
    }

    // -------------------------------------------------------------------------
    // SNAPSHOTS
    // -------------------------------------------------------------------------

    /// Build an export file of the live document, stamped with the current time.
    pub fn export_snapshot(&self) -> Result<SnapshotFile, CofferError> {
        export_snapshot(&self.document, self.coordinator.codec(), chrono::Utc::now())
    }

    /// Import a snapshot file behind a confirmation gate, then save once.
    pub async fn import_snapshot<F>(
        &mut self,
        bytes: &[u8],
        confirm: F,
    ) -> Result<Committed<PreparedImport>, ImportRejection>
    where
        F: FnOnce(&PreparedImport) -> bool,
    {
        let prepared = import_into(&mut self.document, bytes, self.coordinator.codec(), confirm)?;
        tracing::info!(
            rung = %prepared.strategy,
            records = prepared.record_count(),
            "Snapshot imported"
        );
        Ok(self.commit(prepared).await)
    }

    // -------------------------------------------------------------------------
    // REMOTE
    // -------------------------------------------------------------------------

    /// Point persistence at a remote endpoint.
    ///
    /// The endpoint is checked with a read; the identifier is stored whatever
    /// the check says, and only a successful check triggers the migrating save.
    pub async fn connect_remote(&self, identifier: &str) -> Result<ConnectReport, CofferError> {
        let address = self.coordinator.resolve(identifier);
        let reachable = self.coordinator.check_reachable(&address).await;
        self.coordinator.settings().set_remote_endpoint(identifier)?;

        let report = match reachable {
            Ok(()) => {
                tracing::info!(remote = %address, "Remote endpoint connected, migrating data");
                ConnectReport {
                    address,
                    reach_failure: None,
                    migrated: Some(self.save().await),
                }
            }
            Err(reason) => {
                tracing::warn!(remote = %address, %reason, "Remote endpoint stored but not verified");
                ConnectReport {
                    address,
                    reach_failure: Some(reason),
                    migrated: None,
                }
            }
        };
        Ok(report)
    }

    pub fn clear_remote(&self) -> Result<(), CofferError> {
        self.coordinator.clear_remote()
    }

    pub async fn push_local_to_remote(&self) -> Result<(), CofferError> {
        self.coordinator.push_local_to_remote().await
    }
}
