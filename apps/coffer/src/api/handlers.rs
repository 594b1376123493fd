//! # API Endpoint Handlers
//!
//! The exec endpoint stores one opaque blob per deployment. It never decodes
//! what it stores: clients send and receive encoded text only.

use super::{
    AppState, auth,
    types::{Action, ActionQuery, HealthResponse, SAVE_REQUIRES_POST_BODY, UNKNOWN_ACTION_BODY},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use coffer_core::CofferError;
use coffer_core::primitives::REMOTE_SAVE_ACK;

type TextResponse = (StatusCode, String);

fn not_found() -> TextResponse {
    (StatusCode::NOT_FOUND, "Not Found".to_string())
}

fn text(body: impl Into<String>) -> TextResponse {
    (StatusCode::OK, body.into())
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.deployments.len()))
}

// =============================================================================
// EXEC HANDLERS
// =============================================================================

/// Read the stored blob for a deployment; empty body when nothing is stored.
fn read_blob(state: &AppState, deployment: &str) -> TextResponse {
    match state.blobs.read(deployment) {
        Ok(blob) => text(blob.unwrap_or_default()),
        Err(e) => {
            tracing::error!(deployment, error = %e, "Blob read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", e))
        }
    }
}

/// `GET /macros/s/{deployment}/exec?action=read`
pub async fn exec_get_handler(
    State(state): State<AppState>,
    Path(deployment): Path<String>,
    Query(query): Query<ActionQuery>,
) -> impl IntoResponse {
    let Some(deployment) = auth::find_deployment(&state.deployments, &deployment) else {
        return not_found();
    };

    match query.action() {
        Some(Action::Read) => read_blob(&state, deployment),
        Some(Action::Save) => text(SAVE_REQUIRES_POST_BODY),
        None => text(UNKNOWN_ACTION_BODY),
    }
}

/// `POST /macros/s/{deployment}/exec?action=save` with the blob as body.
///
/// Answers exactly `ok` once the blob is durable.
pub async fn exec_post_handler(
    State(state): State<AppState>,
    Path(deployment): Path<String>,
    Query(query): Query<ActionQuery>,
    body: String,
) -> impl IntoResponse {
    let Some(deployment) = auth::find_deployment(&state.deployments, &deployment) else {
        return not_found();
    };

    match query.action() {
        Some(Action::Save) => match state.blobs.write(deployment, &body) {
            Ok(()) => {
                tracing::info!(deployment, bytes = body.len(), "Blob stored");
                text(REMOTE_SAVE_ACK)
            }
            Err(e @ CofferError::CapacityExceeded { .. }) => {
                tracing::warn!(deployment, error = %e, "Blob rejected");
                (StatusCode::INSUFFICIENT_STORAGE, format!("error: {}", e))
            }
            Err(e) => {
                tracing::error!(deployment, error = %e, "Blob write failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", e))
            }
        },
        Some(Action::Read) => read_blob(&state, deployment),
        None => text(UNKNOWN_ACTION_BODY),
    }
}
