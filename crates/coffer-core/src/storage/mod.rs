//! # Local Slot Storage
//!
//! Synchronous key-value slots on the local device.
//!
//! Two implementations share the [`SlotStore`] trait:
//! - [`MemorySlots`]: in-memory map (tests, ephemeral sessions)
//! - [`RedbSlots`]: redb-backed file (the default on-device store)
//!
//! Both enforce a byte quota over the whole store. Exceeding it is the only
//! ordinary failure of a local write and is reported as
//! [`CofferError::CapacityExceeded`]; it is never retried here.

mod memory;
mod redb_slots;

pub use memory::MemorySlots;
pub use redb_slots::RedbSlots;

use crate::CofferError;

/// A local key-value slot store.
pub trait SlotStore: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot was never written.
    fn read(&self, key: &str) -> Result<Option<String>, CofferError>;

    /// Write a slot, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), CofferError>;

    /// Remove a slot. Removing an absent slot is not an error.
    fn remove(&self, key: &str) -> Result<(), CofferError>;

    /// The byte quota for the whole store.
    fn quota(&self) -> u64;
}

impl<T: SlotStore + ?Sized> SlotStore for &T {
    fn read(&self, key: &str) -> Result<Option<String>, CofferError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CofferError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CofferError> {
        (**self).remove(key)
    }

    fn quota(&self) -> u64 {
        (**self).quota()
    }
}

/// Bytes a slot occupies: key plus value, as on-device stores count them.
pub(crate) fn slot_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

/// Reject a write that would push the store past its quota.
pub(crate) fn check_quota(
    used_by_others: u64,
    key: &str,
    value: &str,
    quota: u64,
) -> Result<(), CofferError> {
    let requested = used_by_others.saturating_add(slot_size(key, value));
    if requested > quota {
        return Err(CofferError::CapacityExceeded { requested, quota });
    }
    Ok(())
}
