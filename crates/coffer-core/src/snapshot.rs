//! # Portable Snapshot Transfer
//!
//! Export the live document to a text file and bring it back.
//!
//! An export file is the encoded blob of the document with two extra
//! top-level keys, `exportDate` and `version`. There is no header: on import
//! the format is inferred the same way as on load (decode, else legacy JSON),
//! so plain-JSON backups from older builds are accepted too.
//!
//! `exportDate` and `version` are reserved at the top level. Export always
//! writes them, replacing any live field of the same name. Import strips them
//! only as the pair export writes (an RFC 3339 `exportDate` next to a string
//! `version`); a file carrying just one of them, or other values, keeps both
//! as ordinary fields.
//!
//! Import never touches the live document until every check has passed and
//! the confirmation gate has answered yes.

use crate::codec::ObfuscationCodec;
use crate::primitives::{
    EXPORT_DATE_KEY, EXPORT_VERSION_KEY, MAX_IMPORT_FILE_SIZE, SNAPSHOT_FILE_PREFIX,
    SNAPSHOT_FORMAT_VERSION,
};
use crate::recovery::{self, Recovery, Strategy};
use crate::types::{DocumentPatch, StateDocument};
use crate::{CofferError, validator};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// EXPORT
// =============================================================================

/// A ready-to-write export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Suggested file name, e.g. `coffer-backup-2026-10-18.txt`.
    pub file_name: String,
    /// The encoded blob.
    pub contents: String,
}

/// Suggested file name for a snapshot captured at the given instant.
#[must_use]
pub fn snapshot_file_name(captured_at: DateTime<Utc>) -> String {
    format!(
        "{}{}.txt",
        SNAPSHOT_FILE_PREFIX,
        captured_at.date_naive().format("%Y-%m-%d")
    )
}

/// Build an export file for the document.
pub fn export_snapshot(
    document: &StateDocument,
    codec: &ObfuscationCodec,
    captured_at: DateTime<Utc>,
) -> Result<SnapshotFile, CofferError> {
    let mut value = document.to_value()?;
    let Value::Object(fields) = &mut value else {
        return Err(CofferError::SerializationError(
            "State document did not serialize to an object".to_string(),
        ));
    };
    fields.insert(
        EXPORT_DATE_KEY.to_string(),
        Value::String(captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    fields.insert(
        EXPORT_VERSION_KEY.to_string(),
        Value::String(SNAPSHOT_FORMAT_VERSION.to_string()),
    );

    Ok(SnapshotFile {
        file_name: snapshot_file_name(captured_at),
        contents: codec.encode(&value)?,
    })
}

// =============================================================================
// IMPORT
// =============================================================================

/// Why an import was refused. The live document is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportRejection {
    /// The file exceeds the import size limit.
    #[error("file too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    /// Neither a blob nor legacy JSON, or not a document at all.
    #[error("corrupt or foreign file")]
    CorruptOrForeign,

    /// Recognised data that fails structural validation.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// The confirmation gate answered no.
    #[error("import declined")]
    Declined,
}

/// A validated import, waiting for confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImport {
    patch: DocumentPatch,
    /// Which format the file was read as.
    pub strategy: Strategy,
    /// `exportDate` carried by the file, if any.
    pub exported_at: Option<String>,
    /// `version` carried by the file, if any.
    pub format_version: Option<String>,
}

impl PreparedImport {
    /// The top-level fields that will replace live ones.
    #[must_use]
    pub fn patch(&self) -> &DocumentPatch {
        &self.patch
    }

    /// Total number of records across all sequences in the file.
    #[must_use]
    pub fn record_count(&self) -> usize {
        crate::Collection::ALL
            .iter()
            .filter_map(|c| self.patch.fields().get(c.as_str()))
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum()
    }
}

/// Decode, validate and strip an import file.
pub fn prepare_import(
    bytes: &[u8],
    codec: &ObfuscationCodec,
) -> Result<PreparedImport, ImportRejection> {
    if bytes.len() > MAX_IMPORT_FILE_SIZE {
        return Err(ImportRejection::TooLarge {
            size: bytes.len(),
            limit: MAX_IMPORT_FILE_SIZE,
        });
    }
    let text = std::str::from_utf8(bytes).map_err(|_| ImportRejection::CorruptOrForeign)?;

    let (mut patch, strategy) = match recovery::recover(codec, text) {
        Recovery::Recovered { patch, strategy } => (patch, strategy),
        Recovery::Failed { .. } | Recovery::Exhausted => {
            return Err(ImportRejection::CorruptOrForeign);
        }
    };

    if let Some(violation) = validator::first_violation(&patch.to_value()) {
        return Err(ImportRejection::InvalidStructure(violation));
    }

    let (exported_at, format_version) = match take_export_metadata(&mut patch) {
        Some((date, version)) => (Some(date), Some(version)),
        None => (None, None),
    };

    Ok(PreparedImport {
        patch,
        strategy,
        exported_at,
        format_version,
    })
}

/// Remove the `exportDate`/`version` pair if it looks like export output.
fn take_export_metadata(patch: &mut DocumentPatch) -> Option<(String, String)> {
    let fields = patch.fields();
    let date = fields.get(EXPORT_DATE_KEY)?.as_str()?;
    let version = fields.get(EXPORT_VERSION_KEY)?.as_str()?;
    DateTime::parse_from_rfc3339(date).ok()?;

    let metadata = (date.to_string(), version.to_string());
    patch.take(EXPORT_DATE_KEY);
    patch.take(EXPORT_VERSION_KEY);
    Some(metadata)
}

/// Run a full import against the live document.
///
/// The merged result is computed on a copy first, so a file that passes the
/// validator but does not fit the document model is rejected without any
/// change. `confirm` is the single synchronous gate before the swap.
pub fn import_into<F>(
    document: &mut StateDocument,
    bytes: &[u8],
    codec: &ObfuscationCodec,
    confirm: F,
) -> Result<PreparedImport, ImportRejection>
where
    F: FnOnce(&PreparedImport) -> bool,
{
    let prepared = prepare_import(bytes, codec)?;

    let mut next = document.clone();
    next.apply(prepared.patch())
        .map_err(|e| ImportRejection::InvalidStructure(e.to_string()))?;

    if !confirm(&prepared) {
        return Err(ImportRejection::Declined);
    }

    *document = next;
    Ok(prepared)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Collection;
    use chrono::TimeZone;
    use serde_json::json;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 14, 30, 0)
            .single()
            .expect("valid instant")
    }

    fn sample_document() -> StateDocument {
        let mut doc = StateDocument::new();
        let mut record = crate::Record::new();
        record.insert("id".to_string(), json!("t1"));
        record.insert("amount".to_string(), json!(42.75));
        record.insert("category".to_string(), json!("food"));
        doc.upsert_record(Collection::Transactions, record);
        doc
    }

    #[test]
    fn export_names_file_by_date() {
        let file = export_snapshot(&StateDocument::new(), &ObfuscationCodec::default(), captured())
            .expect("export");
        assert_eq!(file.file_name, "coffer-backup-2026-03-09.txt");
    }

    #[test]
    fn export_carries_timestamp_and_version() {
        let codec = ObfuscationCodec::default();
        let file = export_snapshot(&sample_document(), &codec, captured()).expect("export");

        let decoded = codec.decode(&file.contents).expect("decode");
        assert_eq!(decoded["exportDate"], json!("2026-03-09T14:30:00.000Z"));
        assert_eq!(decoded["version"], json!("1.0.0"));
    }

    #[test]
    fn export_then_import_roundtrips() {
        let codec = ObfuscationCodec::default();
        let original = sample_document();
        let file = export_snapshot(&original, &codec, captured()).expect("export");

        let mut live = StateDocument::new();
        let prepared =
            import_into(&mut live, file.contents.as_bytes(), &codec, |_| true).expect("import");

        assert_eq!(live, original);
        assert_eq!(prepared.strategy, Strategy::DecodeBlob);
        assert_eq!(prepared.exported_at.as_deref(), Some("2026-03-09T14:30:00.000Z"));
        assert_eq!(prepared.record_count(), 1);
    }

    #[test]
    fn legacy_plain_json_accepted() {
        let codec = ObfuscationCodec::default();
        let legacy = json!({
            "transactions": [{"id": "a"}],
            "investments": [],
            "cards": [],
            "categories": {"income": [], "expense": [], "investment": []}
        })
        .to_string();

        let mut live = StateDocument::new();
        let prepared =
            import_into(&mut live, legacy.as_bytes(), &codec, |_| true).expect("import");

        assert_eq!(prepared.strategy, Strategy::LegacyJson);
        assert_eq!(live.transactions.len(), 1);
        assert!(live.categories.income.is_empty());
    }

    #[test]
    fn version_field_without_export_date_is_data() {
        let codec = ObfuscationCodec::default();
        let legacy = json!({
            "transactions": [],
            "investments": [],
            "cards": [],
            "categories": {"income": [], "expense": [], "investment": []},
            "version": 3
        })
        .to_string();

        let mut live = StateDocument::new();
        let prepared =
            import_into(&mut live, legacy.as_bytes(), &codec, |_| true).expect("import");

        assert_eq!(prepared.format_version, None);
        assert_eq!(live.extra.get("version"), Some(&json!(3)));
    }

    #[test]
    fn export_metadata_pair_is_stripped() {
        let codec = ObfuscationCodec::default();
        let mut original = sample_document();
        original
            .extra
            .insert("version".to_string(), json!("live value"));
        let file = export_snapshot(&original, &codec, captured()).expect("export");

        let mut live = StateDocument::new();
        let prepared =
            import_into(&mut live, file.contents.as_bytes(), &codec, |_| true).expect("import");

        // Export replaced the live field; import removes the pair it wrote.
        assert_eq!(prepared.format_version.as_deref(), Some("1.0.0"));
        assert!(!live.extra.contains_key("version"));
        assert!(!live.extra.contains_key("exportDate"));
    }

    #[test]
    fn irregular_but_valid_file_imports() {
        let codec = ObfuscationCodec::default();
        let file = json!({
            "transactions": [{"id": "t1"}, 17, "loose note"],
            "investments": [],
            "cards": [],
            "subscriptions": "",
            "categories": {
                "income": [{"id": "bonus", "name": "Bonus"}],
                "expense": [null],
                "investment": []
            }
        });
        let blob = codec.encode(&file).expect("encode");

        let mut live = sample_document();
        import_into(&mut live, blob.as_bytes(), &codec, |_| true).expect("import");

        let value = live.to_value().expect("value");
        assert_eq!(value["transactions"], file["transactions"]);
        assert_eq!(value["categories"], file["categories"]);
        assert!(live.subscriptions.is_empty());
    }

    #[test]
    fn foreign_file_rejected() {
        let codec = ObfuscationCodec::default();
        let mut live = sample_document();
        let before = live.clone();

        let result = import_into(&mut live, b"hello, world", &codec, |_| true);

        assert_eq!(result, Err(ImportRejection::CorruptOrForeign));
        assert_eq!(live, before);
    }

    #[test]
    fn missing_investment_domain_rejected() {
        let codec = ObfuscationCodec::default();
        let blob = codec
            .encode(&json!({
                "transactions": [],
                "investments": [],
                "cards": [],
                "categories": {"income": [], "expense": []}
            }))
            .expect("encode");
        let mut live = sample_document();
        let before = live.clone();

        let result = import_into(&mut live, blob.as_bytes(), &codec, |_| true);

        assert!(matches!(result, Err(ImportRejection::InvalidStructure(_))));
        assert_eq!(live, before);
    }

    #[test]
    fn declined_import_leaves_document() {
        let codec = ObfuscationCodec::default();
        let file = export_snapshot(&StateDocument::new(), &codec, captured()).expect("export");
        let mut live = sample_document();
        let before = live.clone();

        let result = import_into(&mut live, file.contents.as_bytes(), &codec, |_| false);

        assert_eq!(result, Err(ImportRejection::Declined));
        assert_eq!(live, before);
    }

    #[test]
    fn confirmation_not_asked_for_invalid_files() {
        let codec = ObfuscationCodec::default();
        let mut live = StateDocument::new();
        let mut asked = false;

        let _ = import_into(&mut live, b"{\"cards\": 3}", &codec, |_| {
            asked = true;
            true
        });

        assert!(!asked);
    }

    #[test]
    fn oversized_file_rejected_before_decoding() {
        let codec = ObfuscationCodec::default();
        let bytes = vec![b'A'; MAX_IMPORT_FILE_SIZE + 1];
        assert!(matches!(
            prepare_import(&bytes, &codec),
            Err(ImportRejection::TooLarge { .. })
        ));
    }
}
