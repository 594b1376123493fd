//! # Property-Based Tests
//!
//! Invariants of the codec, the recovery ladder and the shallow merge,
//! checked with proptest.

use coffer_core::{
    Collection, DocumentPatch, ObfuscationCodec, Recovery, StateDocument,
    Strategy as LadderStrategy, is_valid, recover,
};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Value, json};

// =============================================================================
// STRATEGIES
// =============================================================================

/// Amounts as a browser writes them: decimal text with long binary tails.
fn money() -> impl Strategy<Value = f64> {
    "-?[0-9]{1,9}\\.[0-9]{1,14}".prop_map(|text| text.parse::<f64>().unwrap_or_default())
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        money().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::from),
        "\\PC{0,8}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn record() -> impl Strategy<Value = Value> {
    btree_map("[a-zA-Z]{1,10}", field_value(), 0..6)
        .prop_map(|fields| Value::Object(fields.into_iter().collect()))
}

/// Any sequence entry, well-formed or not.
fn entry() -> impl Strategy<Value = Value> {
    prop_oneof![record(), field_value()]
}

fn document() -> impl Strategy<Value = StateDocument> {
    (
        vec(record(), 0..5),
        vec(record(), 0..3),
        vec(record(), 0..3),
        vec(record(), 0..3),
    )
        .prop_map(|(transactions, investments, cards, reminders)| {
            let mut doc = StateDocument::new();
            doc.transactions = transactions;
            doc.investments = investments;
            doc.cards = cards;
            doc.reminders = reminders;
            doc
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Encoding then decoding yields the same document.
    #[test]
    fn codec_roundtrip_preserves_document(doc in document()) {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&doc).expect("encode");
        let decoded: StateDocument = codec.decode_as(&blob).expect("decode");
        prop_assert_eq!(decoded, doc);
    }

    /// Same document, same blob.
    #[test]
    fn encoding_is_deterministic(doc in document()) {
        let codec = ObfuscationCodec::default();
        prop_assert_eq!(codec.encode(&doc).expect("encode"), codec.encode(&doc).expect("encode"));
    }

    /// Decoding arbitrary text never panics.
    #[test]
    fn decode_never_panics(text in "\\PC{0,64}") {
        let codec = ObfuscationCodec::default();
        let _ = codec.decode(&text);
    }

    /// Any key round-trips any JSON object it encodes.
    #[test]
    fn custom_key_roundtrip(key in vec(any::<u8>(), 1..24), n in any::<i64>()) {
        let codec = ObfuscationCodec::new(key).expect("key");
        let payload = json!({"n": n});
        let blob = codec.encode(&payload).expect("encode");
        prop_assert_eq!(codec.decode(&blob), Some(payload));
    }

    /// The ladder reads both encoded blobs and plain JSON, preferring the blob rung.
    #[test]
    fn ladder_reads_both_formats(doc in document()) {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&doc).expect("encode");
        let plain = serde_json::to_string(&doc).expect("plain");

        let from_blob = recover(&codec, &blob);
        let from_plain = recover(&codec, &plain);

        let blob_strategy = match from_blob {
            Recovery::Recovered { strategy, .. } => Some(strategy),
            _ => None,
        };
        let plain_strategy = match from_plain {
            Recovery::Recovered { strategy, .. } => Some(strategy),
            _ => None,
        };
        prop_assert_eq!(blob_strategy, Some(LadderStrategy::DecodeBlob));
        prop_assert_eq!(plain_strategy, Some(LadderStrategy::LegacyJson));
    }

    /// Fields absent from a patch keep their previous value.
    #[test]
    fn shallow_merge_keeps_absent_fields(base in document(), incoming in vec(record(), 0..4)) {
        let mut doc = base.clone();
        let patch = DocumentPatch::from_value(json!({ "cards": incoming.clone() }))
            .expect("object");

        doc.apply(&patch).expect("apply");

        prop_assert_eq!(doc.records(Collection::Cards), incoming.as_slice());
        prop_assert_eq!(&doc.transactions, &base.transactions);
        prop_assert_eq!(&doc.categories, &base.categories);
    }

    /// Whatever the validator accepts merges without loss.
    #[test]
    fn valid_documents_always_apply(
        transactions in vec(entry(), 0..4),
        cards in vec(entry(), 0..4),
        income in vec(entry(), 0..4),
        expense in vec(entry(), 0..3),
    ) {
        let candidate = json!({
            "transactions": transactions,
            "investments": [],
            "cards": cards,
            "categories": {"income": income, "expense": expense, "investment": []}
        });
        prop_assert!(is_valid(&candidate));

        let mut doc = StateDocument::new();
        doc.apply(&DocumentPatch::from_value(candidate.clone()).expect("object"))
            .expect("apply");

        let value = doc.to_value().expect("value");
        prop_assert_eq!(&value["transactions"], &candidate["transactions"]);
        prop_assert_eq!(&value["cards"], &candidate["cards"]);
        prop_assert_eq!(&value["categories"], &candidate["categories"]);
    }
}
