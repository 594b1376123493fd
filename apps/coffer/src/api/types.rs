//! # API Request/Response Types

use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of deployments this server answers for.
    pub deployments: usize,
}

impl HealthResponse {
    #[must_use]
    pub fn new(deployments: usize) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            deployments,
        }
    }
}

// =============================================================================
// ACTION QUERY
// =============================================================================

/// Query string of the exec endpoint: `?action=read|save`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

/// A recognised exec action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Save,
}

impl ActionQuery {
    /// The requested action, if it is one the endpoint knows.
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        use coffer_core::primitives::{ACTION_READ, ACTION_SAVE};

        match self.action.as_deref() {
            Some(ACTION_READ) => Some(Action::Read),
            Some(ACTION_SAVE) => Some(Action::Save),
            _ => None,
        }
    }
}

/// Body answered for a missing or unknown action. Anything but `"ok"` is a
/// failure to clients.
pub const UNKNOWN_ACTION_BODY: &str = "error: unknown action";

/// Body answered when a save arrives over GET.
pub const SAVE_REQUIRES_POST_BODY: &str = "error: save requires POST";
