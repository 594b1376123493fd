//! # Recovery Ladder
//!
//! Turns stored or imported text back into a [`DocumentPatch`].
//!
//! Strategies are tried in a fixed order. Each one answers with a [`Rung`]:
//! - `Hit` stops the ladder with a patch,
//! - `Miss` hands the text to the next strategy,
//! - `Failed` stops the ladder without a patch.
//!
//! Running out of strategies is an ordinary outcome (no document), not an error.

use crate::codec::ObfuscationCodec;
use crate::types::DocumentPatch;
use serde_json::Value;
use std::fmt;

/// A named way of reading stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The current encoded blob format.
    DecodeBlob,
    /// Plain JSON written before encoding existed.
    LegacyJson,
}

impl Strategy {
    /// Ladder order used by load and import.
    pub const LADDER: [Strategy; 2] = [Strategy::DecodeBlob, Strategy::LegacyJson];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DecodeBlob => "decode-blob",
            Self::LegacyJson => "legacy-json",
        }
    }

    /// Whether data read this way should be re-saved in encoded form.
    #[must_use]
    pub const fn needs_migration(self) -> bool {
        matches!(self, Self::LegacyJson)
    }

    /// Run this single strategy against the text.
    #[must_use]
    pub fn attempt(self, codec: &ObfuscationCodec, text: &str) -> Rung {
        if text.trim().is_empty() {
            return Rung::Miss;
        }
        let parsed = match self {
            Self::DecodeBlob => codec.decode(text),
            Self::LegacyJson => serde_json::from_str::<Value>(text).ok(),
        };
        match parsed {
            None => Rung::Miss,
            Some(value) => match DocumentPatch::from_value(value) {
                Some(patch) => Rung::Hit(patch),
                None => Rung::Failed("recovered data is not an object".to_string()),
            },
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a single strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Rung {
    Hit(DocumentPatch),
    Miss,
    Failed(String),
}

/// Result of the whole ladder.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    /// A strategy produced a patch.
    Recovered {
        patch: DocumentPatch,
        strategy: Strategy,
    },
    /// A strategy recognised the text but it was unusable.
    Failed { strategy: Strategy, reason: String },
    /// No strategy recognised the text.
    Exhausted,
}

impl Recovery {
    /// The recovered patch, if any.
    #[must_use]
    pub fn into_patch(self) -> Option<(DocumentPatch, Strategy)> {
        match self {
            Self::Recovered { patch, strategy } => Some((patch, strategy)),
            Self::Failed { .. } | Self::Exhausted => None,
        }
    }
}

/// Run the ladder over stored text.
#[must_use]
pub fn recover(codec: &ObfuscationCodec, text: &str) -> Recovery {
    for strategy in Strategy::LADDER {
        match strategy.attempt(codec, text) {
            Rung::Hit(patch) => return Recovery::Recovered { patch, strategy },
            Rung::Failed(reason) => return Recovery::Failed { strategy, reason },
            Rung::Miss => {}
        }
    }
    Recovery::Exhausted
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encoded_blob_hits_first_rung() {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&json!({"cards": []})).expect("encode");

        let recovery = recover(&codec, &blob);
        assert!(matches!(
            recovery,
            Recovery::Recovered {
                strategy: Strategy::DecodeBlob,
                ..
            }
        ));
    }

    #[test]
    fn plaintext_json_hits_legacy_rung() {
        let codec = ObfuscationCodec::default();
        assert_eq!(
            Strategy::DecodeBlob.attempt(&codec, r#"{"cards":[]}"#),
            Rung::Miss
        );

        let (patch, strategy) = recover(&codec, r#"{"cards":[]}"#)
            .into_patch()
            .expect("recovered");
        assert_eq!(strategy, Strategy::LegacyJson);
        assert!(strategy.needs_migration());
        assert_eq!(patch.fields().get("cards"), Some(&json!([])));
    }

    #[test]
    fn garbage_exhausts_ladder() {
        let codec = ObfuscationCodec::default();
        assert_eq!(recover(&codec, "definitely not data"), Recovery::Exhausted);
        assert_eq!(recover(&codec, ""), Recovery::Exhausted);
    }

    #[test]
    fn non_object_json_fails_without_patch() {
        let codec = ObfuscationCodec::default();
        let recovery = recover(&codec, "[1, 2, 3]");
        assert!(matches!(
            recovery,
            Recovery::Failed {
                strategy: Strategy::LegacyJson,
                ..
            }
        ));
        assert!(recovery.into_patch().is_none());
    }

    #[test]
    fn encoded_non_object_fails_on_decode_rung() {
        let codec = ObfuscationCodec::default();
        let blob = codec.encode(&json!("just a string")).expect("encode");
        assert!(matches!(
            recover(&codec, &blob),
            Recovery::Failed {
                strategy: Strategy::DecodeBlob,
                ..
            }
        ));
    }
}
