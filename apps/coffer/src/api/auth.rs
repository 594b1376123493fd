//! # Deployment Matching
//!
//! The deployment id in `/macros/s/{deployment}/exec` is the only credential a
//! client presents, so it is matched in constant time against every known id.

use subtle::ConstantTimeEq;

/// Constant-time equality that does not leak where two ids first differ.
///
/// Both sides are padded to the same length so `ct_eq` always runs over the
/// same number of bytes.
fn ids_match(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

/// Find the configured deployment a request names.
///
/// Every known id is compared, even after a match.
pub fn find_deployment<'a>(known: &'a [String], provided: &str) -> Option<&'a str> {
    let mut found = None;
    for id in known {
        if ids_match(provided, id) {
            found = Some(id.as_str());
        }
    }
    if found.is_none() {
        tracing::warn!(
            event = "unknown_deployment",
            "Request for an unknown deployment"
        );
    }
    found
}

// =============================================================================
// TESTS
// =============================================================================
