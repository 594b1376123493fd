//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the store:
//! - The state document and its parts (`StateDocument`, `Categories`, `Category`, `Record`)
//! - Recovered top-level fields awaiting a shallow merge (`DocumentPatch`)
//! - Names for record sequences and category domains (`Collection`, `CategoryDomain`)
//! - Error types (`CofferError`)

mod document;

pub use document::{
    Categories, Category, DocumentPatch, Record, StateDocument, entry_id, record_id,
};

use crate::snapshot::ImportRejection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// COLLECTIONS
// =============================================================================

/// One of the ordered record sequences held by the state document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Transactions,
    Investments,
    Cards,
    Debts,
    Subscriptions,
    Reminders,
}

impl Collection {
    /// Every collection, in document order.
    pub const ALL: [Collection; 6] = [
        Collection::Transactions,
        Collection::Investments,
        Collection::Cards,
        Collection::Debts,
        Collection::Subscriptions,
        Collection::Reminders,
    ];

    /// The top-level document key for this collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Investments => "investments",
            Self::Cards => "cards",
            Self::Debts => "debts",
            Self::Subscriptions => "subscriptions",
            Self::Reminders => "reminders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = CofferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CofferError::InvalidRecord(format!("Unknown collection: {}", s)))
    }
}

/// A category domain inside `categories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDomain {
    Income,
    Expense,
    Investment,
}

impl CategoryDomain {
    pub const ALL: [CategoryDomain; 3] = [
        CategoryDomain::Income,
        CategoryDomain::Expense,
        CategoryDomain::Investment,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Investment => "investment",
        }
    }
}

impl fmt::Display for CategoryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryDomain {
    type Err = CofferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CofferError::InvalidRecord(format!("Unknown category domain: {}", s)))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Coffer store.
///
/// Decode failures are deliberately absent: a blob that does not decode is a
/// recoverable miss (see [`crate::recovery`]), never an error.
#[derive(Debug, Error)]
pub enum CofferError {
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred in a slot store.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A local slot write would exceed the store's byte quota.
    #[error("Storage quota exceeded: {requested} bytes requested, quota is {quota} bytes")]
    CapacityExceeded { requested: u64, quota: u64 },

    /// A settings value is outside its accepted range.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// A record or category could not be accepted.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The configured remote migration policy forbids the operation.
    #[error("Denied by remote policy: {0}")]
    PolicyDenied(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A snapshot import was rejected.
    #[error("Import rejected: {0}")]
    Import(#[from] ImportRejection),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_roundtrip() {
        for collection in Collection::ALL {
            let parsed: Collection = collection.as_str().parse().expect("parse");
            assert_eq!(parsed, collection);
        }
    }

    #[test]
    fn unknown_collection_rejected() {
        let result = "budgets".parse::<Collection>();
        assert!(matches!(result, Err(CofferError::InvalidRecord(_))));
    }

    #[test]
    fn domain_serializes_lowercase() {
        let json = serde_json::to_string(&CategoryDomain::Investment).expect("serialize");
        assert_eq!(json, "\"investment\"");
    }

    #[test]
    fn capacity_error_mentions_quota() {
        let err = CofferError::CapacityExceeded {
            requested: 10,
            quota: 4,
        };
        assert!(err.to_string().contains("quota is 4 bytes"));
    }
}
