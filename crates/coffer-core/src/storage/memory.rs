//! In-memory slot store.

use super::{SlotStore, check_quota, slot_size};
use crate::{CofferError, primitives};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Volatile slot store backed by a `BTreeMap`.
#[derive(Debug)]
pub struct MemorySlots {
    slots: RwLock<BTreeMap<String, String>>,
    quota: u64,
}

impl Default for MemorySlots {
    fn default() -> Self {
        Self::with_quota(primitives::DEFAULT_SLOT_QUOTA_BYTES)
    }
}

impl MemorySlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota: u64) -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            quota,
        }
    }

    fn poisoned() -> CofferError {
        CofferError::IoError("slot lock poisoned".to_string())
    }
}

impl SlotStore for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<String>, CofferError> {
        let slots = self.slots.read().map_err(|_| Self::poisoned())?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CofferError> {
        let mut slots = self.slots.write().map_err(|_| Self::poisoned())?;
        let used_by_others = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| slot_size(k, v))
            .sum();
        check_quota(used_by_others, key, value, self.quota)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CofferError> {
        let mut slots = self.slots.write().map_err(|_| Self::poisoned())?;
        slots.remove(key);
        Ok(())
    }

    fn quota(&self) -> u64 {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_absent_slot() {
        let slots = MemorySlots::new();
        assert_eq!(slots.read("missing").expect("read"), None);
    }

    #[test]
    fn write_then_read() {
        let slots = MemorySlots::new();
        slots.write("k", "v1").expect("write");
        slots.write("k", "v2").expect("overwrite");
        assert_eq!(slots.read("k").expect("read").as_deref(), Some("v2"));
    }

    #[test]
    fn quota_counts_other_slots() {
        let slots = MemorySlots::with_quota(10);
        slots.write("a", "1234").expect("fits");
        // "b" + 5 bytes = 6, plus 5 already used = 11 > 10
        let result = slots.write("b", "12345");
        assert!(matches!(
            result,
            Err(CofferError::CapacityExceeded {
                requested: 11,
                quota: 10
            })
        ));
        assert_eq!(slots.read("b").expect("read"), None);
    }

    #[test]
    fn overwrite_does_not_double_count() {
        let slots = MemorySlots::with_quota(6);
        slots.write("a", "12345").expect("fits");
        slots.write("a", "54321").expect("replacement fits");
    }

    #[test]
    fn remove_absent_is_ok() {
        let slots = MemorySlots::new();
        slots.remove("nothing").expect("remove");
    }
}
