//! # Store Primitives
//!
//! Fixed constants compiled into the store.
//!
//! These values define the on-device layout and the wire format. Changing any
//! of them orphans data written by earlier builds, so they are immutable at
//! runtime and shared by every component.

/// Shared secret for the obfuscation codec.
///
/// Identical for encode and decode, never rotated, never user-supplied.
/// This is NOT a security boundary: see [`crate::codec`].
pub const SHARED_SECRET: &str = "ByMoralesa";

// =============================================================================
// LOCAL SLOT KEYS
// =============================================================================

/// Slot holding the encoded state document.
pub const DOCUMENT_SLOT: &str = "financeTrackerData";

/// Slot holding stored text that was recognised but could not be loaded.
///
/// Written before anything can overwrite the original, so a later save
/// never destroys data the loader failed to understand.
pub const SET_ASIDE_SLOT: &str = "financeTrackerData.unreadable";

/// Slot holding the optional Remote Endpoint Identifier.
pub const REMOTE_ENDPOINT_SLOT: &str = "googleScriptKey";

/// Slot holding the reminder lookahead window (integer days, as text).
pub const REMINDER_DAYS_SLOT: &str = "reminderDaysThreshold";

/// Slot holding the UI theme preference.
pub const THEME_SLOT: &str = "financeTrackerTheme";

// =============================================================================
// SETTINGS BOUNDS
// =============================================================================

/// Reminder lookahead used when nothing (or nothing valid) is stored.
pub const DEFAULT_REMINDER_DAYS: u8 = 7;

/// Smallest accepted reminder lookahead.
pub const MIN_REMINDER_DAYS: u8 = 1;

/// Largest accepted reminder lookahead.
pub const MAX_REMINDER_DAYS: u8 = 30;

// =============================================================================
// CAPACITY
// =============================================================================

/// Default byte quota for a local slot store.
///
/// Mirrors the per-origin quota of typical on-device key-value storage.
/// Exceeding it is the only way a local write fails.
pub const DEFAULT_SLOT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Maximum accepted size of an import file, checked before decoding.
pub const MAX_IMPORT_FILE_SIZE: usize = 10 * 1024 * 1024;

// =============================================================================
// REMOTE PROTOCOL
// =============================================================================

/// Exact response body that acknowledges a remote save.
pub const REMOTE_SAVE_ACK: &str = "ok";

/// Query value for a remote read.
pub const ACTION_READ: &str = "read";

/// Query value for a remote save.
pub const ACTION_SAVE: &str = "save";

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Format tag attached to exported snapshots.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0.0";

/// Top-level key carrying the export timestamp.
pub const EXPORT_DATE_KEY: &str = "exportDate";

/// Top-level key carrying the format tag.
pub const EXPORT_VERSION_KEY: &str = "version";

/// Prefix of exported snapshot file names.
pub const SNAPSHOT_FILE_PREFIX: &str = "coffer-backup-";
