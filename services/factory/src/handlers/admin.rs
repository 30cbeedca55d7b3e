//! Administrative handlers

use crate::auth::AuthAdmin;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use types::vendor::{Role, Vendor};

#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub id: Option<String>,
    pub roles: Option<Vec<Role>>,
}

pub async fn list_vendors(
    State(state): State<AppState>,
    _auth: AuthAdmin,
) -> Result<Json<Vec<Vendor>>, AppError> {
    let vendors = state.store.vendors().await?;
    Ok(Json(vendors))
}

/// Grant or revoke the admin role on a vendor.
pub async fn update_vendor(
    State(state): State<AppState>,
    _auth: AuthAdmin,
    Json(payload): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, AppError> {
    let id = payload
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required parameter".into()))?;

    if let Some(roles) = payload.roles {
        state
            .store
            .assign_role(&id, Role::Admin, roles.contains(&Role::Admin))
            .await?;
    }

    let vendor = state
        .store
        .vendor_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor not found".into()))?;
    Ok(Json(vendor))
}

/// Remove a vendor's chaos record outside the challenge-response path.
pub async fn clear_chaos(
    State(state): State<AppState>,
    _auth: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.clear_chaos(&id).await?;
    tracing::info!(vendor = %id, "chaos removed by admin");
    Ok(Json(json!({ "message": "chaos cleared" })))
}

/// Remove a vendor; cascades to roles, login codes, chaos, and connections.
pub async fn delete_vendor(
    State(state): State<AppState>,
    _auth: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.store.delete_vendor(&id).await? {
        return Err(AppError::NotFound("Vendor not found".into()));
    }
    tracing::info!(vendor = %id, "vendor deleted");
    Ok(Json(json!({ "message": "vendor deleted" })))
}
