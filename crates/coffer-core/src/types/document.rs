//! # State Document
//!
//! The single root aggregate holding every user record and category.
//!
//! Sequence entries are kept as insertion-ordered JSON values: the store never
//! inspects an entry beyond an optional `id` (and a category's `name`), so any
//! entry shape the validator lets through loads, saves and round-trips
//! untouched. Unknown keys at any level survive as well.

use super::{CategoryDomain, Collection, CofferError};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single user record (transaction, card, reminder, ...) as built by callers.
pub type Record = Map<String, Value>;

/// Label shown by consumers for a category id that no longer exists.
const UNKNOWN_CATEGORY_LABEL: &str = "Unknown";

/// The identifier of a record, if it carries one.
///
/// Ids are written as strings; numeric ids from older data are rendered
/// in their decimal form.
#[must_use]
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The identifier of a stored entry. Non-object entries have none.
#[must_use]
pub fn entry_id(entry: &Value) -> Option<String> {
    entry.as_object().and_then(record_id)
}

fn has_id(entry: &Value, id: &str) -> bool {
    entry_id(entry).as_deref() == Some(id)
}

// =============================================================================
// CATEGORIES
// =============================================================================

/// A new `{id, name, color}` category, as created by the user.
///
/// Stored categories are plain entries in [`Categories`]; this type only
/// builds well-formed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Category {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

impl From<Category> for Value {
    fn from(category: Category) -> Self {
        let mut entry = Map::new();
        entry.insert("id".to_string(), Value::String(category.id));
        entry.insert("name".to_string(), Value::String(category.name));
        entry.insert("color".to_string(), Value::String(category.color));
        Value::Object(entry)
    }
}

/// Category sequences per domain.
///
/// A domain missing from stored data reads back as empty rather than
/// discarding the whole document; import validation still insists on all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    #[serde(default)]
    pub income: Vec<Value>,
    #[serde(default)]
    pub expense: Vec<Value>,
    #[serde(default)]
    pub investment: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Categories {
    /// The categories of one domain.
    #[must_use]
    pub fn domain(&self, domain: CategoryDomain) -> &[Value] {
        match domain {
            CategoryDomain::Income => &self.income,
            CategoryDomain::Expense => &self.expense,
            CategoryDomain::Investment => &self.investment,
        }
    }

    pub fn domain_mut(&mut self, domain: CategoryDomain) -> &mut Vec<Value> {
        match domain {
            CategoryDomain::Income => &mut self.income,
            CategoryDomain::Expense => &mut self.expense,
            CategoryDomain::Investment => &mut self.investment,
        }
    }
}

impl Default for Categories {
    fn default() -> Self {
        let tuples = |items: &[(&str, &str, &str)]| -> Vec<Value> {
            items
                .iter()
                .map(|(id, name, color)| Category::new(*id, *name, *color).into())
                .collect()
        };

        Self {
            income: tuples(&[
                ("salary", "Salary", "#22c55e"),
                ("freelance", "Freelance", "#3b82f6"),
                ("investment-returns", "Investment Returns", "#8b5cf6"),
                ("other-income", "Other Income", "#f59e0b"),
            ]),
            expense: tuples(&[
                ("food", "Food & Dining", "#ef4444"),
                ("transportation", "Transportation", "#06b6d4"),
                ("entertainment", "Entertainment", "#ec4899"),
                ("utilities", "Utilities", "#84cc16"),
                ("shopping", "Shopping", "#f97316"),
                ("healthcare", "Healthcare", "#6366f1"),
                ("education", "Education", "#8b5cf6"),
                ("other-expense", "Other Expenses", "#6b7280"),
            ]),
            investment: tuples(&[
                ("stocks", "Stocks", "#22c55e"),
                ("bonds", "Bonds", "#3b82f6"),
                ("crypto", "Cryptocurrency", "#f59e0b"),
                ("real-estate", "Real Estate", "#8b5cf6"),
                ("mutual-funds", "Mutual Funds", "#06b6d4"),
                ("other", "Other", "#6b7280"),
            ]),
            extra: Map::new(),
        }
    }
}

// =============================================================================
// STATE DOCUMENT
// =============================================================================

/// Accepts a sequence, or an absent/falsy value meaning "empty".
fn falsy_or_sequence<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items),
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Number(n) if n.as_u64() == Some(0) || n.as_i64() == Some(0) => Ok(Vec::new()),
        other => Err(D::Error::custom(format!(
            "expected a sequence, found {}",
            other
        ))),
    }
}

/// The live application state.
///
/// There is no version field: format is inferred structurally on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub transactions: Vec<Value>,
    pub investments: Vec<Value>,
    pub cards: Vec<Value>,
    #[serde(default, deserialize_with = "falsy_or_sequence")]
    pub debts: Vec<Value>,
    #[serde(default, deserialize_with = "falsy_or_sequence")]
    pub subscriptions: Vec<Value>,
    #[serde(default, deserialize_with = "falsy_or_sequence")]
    pub reminders: Vec<Value>,
    pub categories: Categories,
    /// Unknown top-level keys, kept so nothing is lost on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            investments: Vec::new(),
            cards: Vec::new(),
            debts: Vec::new(),
            subscriptions: Vec::new(),
            reminders: Vec::new(),
            categories: Categories::default(),
            extra: Map::new(),
        }
    }
}

impl StateDocument {
    /// Create the built-in default document (default categories, no records).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entries of one collection.
    #[must_use]
    pub fn records(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Transactions => &self.transactions,
            Collection::Investments => &self.investments,
            Collection::Cards => &self.cards,
            Collection::Debts => &self.debts,
            Collection::Subscriptions => &self.subscriptions,
            Collection::Reminders => &self.reminders,
        }
    }

    pub fn records_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Transactions => &mut self.transactions,
            Collection::Investments => &mut self.investments,
            Collection::Cards => &mut self.cards,
            Collection::Debts => &mut self.debts,
            Collection::Subscriptions => &mut self.subscriptions,
            Collection::Reminders => &mut self.reminders,
        }
    }

    /// The record with the given id, if it is an object.
    #[must_use]
    pub fn find_record(&self, collection: Collection, id: &str) -> Option<&Record> {
        self.records(collection)
            .iter()
            .find(|entry| has_id(entry, id))
            .and_then(Value::as_object)
    }

    /// Whether any transactions, investments or cards are present.
    ///
    /// This is the trigger for the normalizing save after a load.
    #[must_use]
    pub fn has_records(&self) -> bool {
        !self.transactions.is_empty() || !self.investments.is_empty() || !self.cards.is_empty()
    }

    /// Insert or replace a record, returning its id.
    ///
    /// A record without an id gets a fresh one. A record whose id matches an
    /// existing entry replaces it in place; otherwise it is appended.
    pub fn upsert_record(&mut self, collection: Collection, mut record: Record) -> String {
        let id = match record_id(&record) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let records = self.records_mut(collection);
        match records.iter_mut().find(|entry| has_id(entry, &id)) {
            Some(slot) => *slot = Value::Object(record),
            None => records.push(Value::Object(record)),
        }
        id
    }

    /// Remove the record with the given id. Returns whether one was removed.
    pub fn remove_record(&mut self, collection: Collection, id: &str) -> bool {
        let records = self.records_mut(collection);
        let before = records.len();
        records.retain(|entry| !has_id(entry, id));
        records.len() != before
    }

    /// Add a category to a domain. Ids must be unique within the domain.
    pub fn add_category(
        &mut self,
        domain: CategoryDomain,
        category: Category,
    ) -> Result<(), CofferError> {
        if category.id.trim().is_empty() {
            return Err(CofferError::InvalidRecord(
                "Category id must not be empty".to_string(),
            ));
        }
        let existing = self.categories.domain_mut(domain);
        if existing.iter().any(|c| has_id(c, &category.id)) {
            return Err(CofferError::InvalidRecord(format!(
                "Category '{}' already exists in {}",
                category.id, domain
            )));
        }
        existing.push(category.into());
        Ok(())
    }

    /// Remove a category. Records referencing it are left dangling on purpose.
    pub fn remove_category(&mut self, domain: CategoryDomain, id: &str) -> bool {
        let existing = self.categories.domain_mut(domain);
        let before = existing.len();
        existing.retain(|c| !has_id(c, id));
        existing.len() != before
    }

    /// Display name for a category id, with a fallback for dangling references
    /// and nameless entries.
    #[must_use]
    pub fn category_label(&self, domain: CategoryDomain, id: &str) -> &str {
        self.categories
            .domain(domain)
            .iter()
            .find(|c| has_id(c, id))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_CATEGORY_LABEL)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value, CofferError> {
        serde_json::to_value(self).map_err(|e| CofferError::SerializationError(e.to_string()))
    }

    /// Shallow-merge recovered fields onto this document.
    ///
    /// Every top-level key present in the patch replaces the current field
    /// wholesale (an empty-but-present sequence overrides too); absent keys
    /// keep their current value. The merge is atomic: if the result does not
    /// fit the document model, `self` is left untouched.
    pub fn apply(&mut self, patch: &DocumentPatch) -> Result<(), CofferError> {
        let mut merged = match self.to_value()? {
            Value::Object(map) => map,
            _ => {
                return Err(CofferError::SerializationError(
                    "State document did not serialize to an object".to_string(),
                ));
            }
        };

        for (key, value) in patch.fields() {
            merged.insert(key.clone(), value.clone());
        }

        let next: StateDocument = serde_json::from_value(Value::Object(merged)).map_err(|e| {
            CofferError::SerializationError(format!("Recovered document does not fit: {}", e))
        })?;
        *self = next;
        Ok(())
    }
}

// =============================================================================
// DOCUMENT PATCH
// =============================================================================

/// Top-level fields recovered from a stored or imported blob.
///
/// A patch is only ever produced from a JSON object; anything else is not a
/// candidate document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentPatch(Map<String, Value>);

impl DocumentPatch {
    /// Wrap a recovered value. Returns `None` for non-objects.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The recovered top-level fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Drop a top-level key, returning its value.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// View the patch as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for DocumentPatch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// TESTS
// =============================================================================
