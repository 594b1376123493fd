//! # coffer-core
//!
//! The persistence core of the Coffer personal-finance ledger.
//!
//! This crate owns everything that decides what bytes are stored:
//! - `types`: the state document, patches and errors
//! - `codec`: the keyed XOR + radix-64 blob format
//! - `recovery`: the ordered ladder that reads stored or imported text
//! - `validator`: the structural check guarding imports
//! - `storage`: local slot stores (in-memory and redb)
//! - `settings`: typed access to the settings slots
//! - `snapshot`: export and confirmed import of whole documents
//!
//! ## Architectural Constraints
//!
//! - Synchronous and pure: no async, no network, no logging
//! - Never panics on stored or imported data; unreadable input is an outcome
//! - The remote transport and the load/save coordinator live in the app crate

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod primitives;
pub mod recovery;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod validator;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Categories, Category, CategoryDomain, CofferError, Collection, DocumentPatch, Record,
    StateDocument, entry_id, record_id,
};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use codec::ObfuscationCodec;
pub use recovery::{Recovery, Rung, Strategy, recover};
pub use settings::{Settings, Theme};
pub use snapshot::{
    ImportRejection, PreparedImport, SnapshotFile, export_snapshot, import_into, prepare_import,
    snapshot_file_name,
};
pub use storage::{MemorySlots, RedbSlots, SlotStore};
pub use validator::{first_violation, is_valid};
