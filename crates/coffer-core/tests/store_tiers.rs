//! # Store Tier Tests (T0-T3)
//!
//! ## Tiers
//! - T0: Blob Integrity
//! - T1: Slot Storage
//! - T2: Recovery and Merge
//! - T3: Snapshot Transfer

use coffer_core::primitives::DOCUMENT_SLOT;
use coffer_core::{
    CofferError, Collection, ImportRejection, MemorySlots, ObfuscationCodec, RedbSlots, Record,
    SlotStore, StateDocument, export_snapshot, import_into, recover,
};
use serde_json::json;

fn record(id: &str, amount: i64) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), json!(id));
    record.insert("amount".to_string(), json!(amount));
    record
}

// =============================================================================
// TIER T0: BLOB INTEGRITY
// =============================================================================

mod t0_blob_integrity {
    use super::*;

    /// T0.1: Blobs written by the browser build decode unchanged.
    #[test]
    fn browser_blob_decodes() {
        let codec = ObfuscationCodec::default();
        assert_eq!(codec.decode("OQQ="), Some(json!({})));
    }

    /// T0.2: A blob never contains the plaintext field names.
    #[test]
    fn blob_hides_field_names() {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&StateDocument::new()).expect("encode");
        assert!(!blob.contains("transactions"));
        assert!(!blob.contains("categories"));
    }
}

// =============================================================================
// TIER T1: SLOT STORAGE
// =============================================================================

mod t1_slot_storage {
    use super::*;

    /// T1.1: An encoded document survives a redb reopen.
    #[test]
    fn document_blob_persists_in_redb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coffer.redb");
        let codec = ObfuscationCodec::default();

        let mut doc = StateDocument::new();
        doc.upsert_record(Collection::Cards, record("c1", 0));
        {
            let slots = RedbSlots::open(&path).expect("open");
            slots
                .write(DOCUMENT_SLOT, &codec.encode(&doc).expect("encode"))
                .expect("write");
        }

        let slots = RedbSlots::open(&path).expect("reopen");
        let blob = slots.read(DOCUMENT_SLOT).expect("read").expect("present");
        let restored: StateDocument = codec.decode_as(&blob).expect("decode");
        assert_eq!(restored, doc);
    }

    /// T1.2: Quota applies across all slots.
    #[test]
    fn quota_counts_every_slot() {
        let slots = MemorySlots::with_quota(20);
        slots.write("a", "0123456789").expect("fits");

        let result = slots.write("b", "0123456789");
        assert!(matches!(
            result,
            Err(CofferError::CapacityExceeded { quota: 20, .. })
        ));
    }
}

// =============================================================================
// TIER T2: RECOVERY AND MERGE
// =============================================================================

mod t2_recovery_and_merge {
    use super::*;

    /// T2.1: A legacy plaintext slot is recovered and merged over defaults.
    #[test]
    fn legacy_slot_merges_over_defaults() {
        let codec = ObfuscationCodec::default();
        let (patch, strategy) = recover(&codec, r#"{"transactions":[{"id":"t1"}]}"#)
            .into_patch()
            .expect("recovered");

        let mut doc = StateDocument::new();
        doc.apply(&patch).expect("apply");

        assert!(strategy.needs_migration());
        assert_eq!(doc.transactions.len(), 1);
        assert_eq!(doc.categories.expense.len(), 8);
    }

    /// T2.2: A recovered document that does not fit leaves state untouched.
    #[test]
    fn mismatched_patch_is_atomic() {
        let codec = ObfuscationCodec::default();
        let blob = codec
            .encode(&json!({"cards": [{"id": "c1"}], "categories": "none"}))
            .expect("encode");
        let (patch, _) = recover(&codec, &blob).into_patch().expect("recovered");

        let mut doc = StateDocument::new();
        let before = doc.clone();
        assert!(doc.apply(&patch).is_err());
        assert_eq!(doc, before);
    }
}

// =============================================================================
// TIER T3: SNAPSHOT TRANSFER
// =============================================================================

mod t3_snapshot_transfer {
    use super::*;
    use chrono::Utc;

    /// T3.1: Export on one device, import on another.
    #[test]
    fn export_import_between_stores() {
        let codec = ObfuscationCodec::default();
        let mut source = StateDocument::new();
        source.upsert_record(Collection::Transactions, record("t1", 25));
        source.upsert_record(Collection::Reminders, record("r1", 0));

        let file = export_snapshot(&source, &codec, Utc::now()).expect("export");

        let mut target = StateDocument::new();
        target.upsert_record(Collection::Cards, record("stale", 1));
        import_into(&mut target, file.contents.as_bytes(), &codec, |prepared| {
            prepared.record_count() == 2
        })
        .expect("import");

        assert_eq!(target, source);
        assert!(!target.extra.contains_key("exportDate"));
        assert!(!target.extra.contains_key("version"));
    }

    /// T3.2: A file missing required sequences is refused with a reason.
    #[test]
    fn structurally_invalid_file_refused() {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&json!({"transactions": []})).expect("encode");

        let mut target = StateDocument::new();
        let result = import_into(&mut target, blob.as_bytes(), &codec, |_| true);

        assert_eq!(
            result,
            Err(ImportRejection::InvalidStructure(
                "'investments' must be a sequence".to_string()
            ))
        );
    }
}
