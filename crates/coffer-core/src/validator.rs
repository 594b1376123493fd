//! # Schema Validator
//!
//! Structural predicate run before an imported document may replace live state.
//!
//! The contract is deliberately narrow: it only rejects obviously foreign
//! files. Record shapes inside each sequence are not inspected, and category
//! or card references are not cross-checked.

use serde_json::Value;

/// Required top-level record sequences.
const REQUIRED_SEQUENCES: [&str; 3] = ["transactions", "investments", "cards"];

/// Sequences added after the first release: absent, falsy or a sequence.
const OPTIONAL_SEQUENCES: [&str; 3] = ["debts", "subscriptions", "reminders"];

/// Required category domains.
const REQUIRED_DOMAINS: [&str; 3] = ["income", "expense", "investment"];

/// Whether a value counts as "not set" for optional fields.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_u64() == Some(0) || n.as_i64() == Some(0),
        _ => false,
    }
}

/// Describe the first structural problem in a candidate, if any.
///
/// `None` means the candidate is structurally acceptable.
#[must_use]
pub fn first_violation(candidate: &Value) -> Option<String> {
    let Value::Object(root) = candidate else {
        return Some("document is not an object".to_string());
    };

    for key in REQUIRED_SEQUENCES {
        if !root.get(key).is_some_and(Value::is_array) {
            return Some(format!("'{}' must be a sequence", key));
        }
    }

    for key in OPTIONAL_SEQUENCES {
        if let Some(value) = root.get(key) {
            if !value.is_array() && !is_falsy(value) {
                return Some(format!("'{}' must be a sequence when present", key));
            }
        }
    }

    let Some(Value::Object(categories)) = root.get("categories") else {
        return Some("'categories' must be present".to_string());
    };

    for domain in REQUIRED_DOMAINS {
        if !categories.get(domain).is_some_and(Value::is_array) {
            return Some(format!("'categories.{}' must be a sequence", domain));
        }
    }

    None
}

/// Structural validity check.
#[must_use]
pub fn is_valid(candidate: &Value) -> bool {
    first_violation(candidate).is_none()
}

// =============================================================================
// TESTS
// =============================================================================
