//! Chaos resolution endpoint
//!
//! Reached through the report URL embedded in a chaos response; the fix code
//! in the path is the real secret, so no bearer auth is required here.

use crate::error::AppError;
use crate::state::AppState;
use crate::store::ResolveOutcome;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use types::ids::ApiKey;

/// Message returned on a successful resolution.
pub const RESOLVED: &str = "Problem resolved. Pizza is back on the menu!";

/// Message returned when no fault is active (including a stale fix code).
pub const NO_CHAOS: &str = "No chaos currently executing";

pub async fn report(
    State(state): State<AppState>,
    Path((api_key, fix_code)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let outcome = state
        .store
        .resolve_chaos(&ApiKey::from(api_key), &fix_code)
        .await?;

    let response = match outcome {
        ResolveOutcome::Resolved => {
            (StatusCode::OK, Json(json!({ "message": RESOLVED }))).into_response()
        }
        ResolveOutcome::NoChaos => {
            (StatusCode::OK, Json(json!({ "message": NO_CHAOS }))).into_response()
        }
        ResolveOutcome::Unresolved => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "unresolved" })),
        )
            .into_response(),
        ResolveOutcome::UnknownVendor => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Unknown vendor" })),
        )
            .into_response(),
    };
    Ok(response)
}
