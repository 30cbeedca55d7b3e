//! Vendor-facing handlers: record access, login codes, pairing, and
//! self-service chaos injection.

use crate::auth::AuthVendor;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::ProfileChanges;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use types::chaos::{Chaos, ChaosKind};
use types::connection::{rating_in_bounds, ConnectionView};
use types::ids::short_code;
use types::vendor::Vendor;

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub id: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub id: Option<String>,
    pub purpose: Option<String>,
    pub rating: Option<u8>,
}

/// The caller's own record, with any live fix code withheld.
pub async fn get_vendor(auth: AuthVendor) -> Json<Vendor> {
    Json(auth.vendor.redacted())
}

pub async fn update_vendor(
    State(state): State<AppState>,
    auth: AuthVendor,
    Json(payload): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, AppError> {
    let changes = ProfileChanges {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        website: payload.website,
    };
    let vendor = state
        .store
        .update_profile(&auth.vendor.id, &changes)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(vendor.redacted()))
}

/// Mint a login code and hand it to the delivery collaborator.
pub async fn create_code(
    State(state): State<AppState>,
    Json(payload): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = payload
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required parameters".into()))?;

    let code = short_code();
    state.store.add_auth_code(&id, &code).await?;
    state.notifier.deliver(&id, &code);

    Ok(Json(json!({ "message": format!("Code sent to {id}") })))
}

/// Exchange a login code for the vendor record, creating the vendor on first
/// authentication.
pub async fn auth_vendor(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Response, AppError> {
    let (Some(id), Some(code)) = (payload.id, payload.code) else {
        return Err(AppError::BadRequest("Missing required parameters".into()));
    };

    if !state.store.validate_auth_code(&id, &code).await? {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid code" })),
        )
            .into_response());
    }

    let vendor = match state.store.vendor_by_id(&id).await? {
        Some(vendor) => vendor,
        None => {
            let vendor = Vendor::new(&id);
            state.store.add_vendor(&vendor).await?;
            tracing::info!(vendor = %id, "vendor registered");
            vendor
        }
    };
    Ok(Json(vendor.redacted()).into_response())
}

/// Request (or re-check) a pairing for a purpose.
pub async fn connect(
    State(state): State<AppState>,
    auth: AuthVendor,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<ConnectionView>, AppError> {
    let purpose = payload
        .purpose
        .filter(|purpose| !purpose.is_empty())
        .ok_or_else(|| AppError::BadRequest("Invalid purpose".into()))?;

    let view = state
        .store
        .request_connection(&auth.vendor.id, &purpose)
        .await?;
    Ok(Json(view))
}

/// Attach a rating to a fulfilled pairing.
pub async fn rate_connection(
    State(state): State<AppState>,
    auth: AuthVendor,
    Json(payload): Json<RateRequest>,
) -> Result<Json<ConnectionView>, AppError> {
    let (Some(partner), Some(purpose), Some(rating)) =
        (payload.id, payload.purpose, payload.rating)
    else {
        return Err(AppError::BadRequest("Missing required parameters".into()));
    };
    if !rating_in_bounds(rating) {
        return Err(AppError::BadRequest("Invalid rating".into()));
    }

    let view = state
        .store
        .rate_connection(&auth.vendor.id, &partner, &purpose, rating)
        .await?
        .ok_or_else(|| AppError::BadRequest("No fulfilled connection to rate".into()))?;
    Ok(Json(view))
}

/// Self-service fault injection.
pub async fn initiate_chaos(
    State(state): State<AppState>,
    auth: AuthVendor,
    Path(kind): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind: ChaosKind = kind
        .parse()
        .ok()
        .filter(ChaosKind::is_injectable)
        .ok_or_else(|| AppError::BadRequest("Invalid chaos type".into()))?;

    let chaos = Chaos::inject(kind);
    state.store.set_chaos(&auth.vendor.id, &chaos).await?;
    tracing::info!(vendor = %auth.vendor.id, kind = %kind, "chaos initiated");

    Ok(Json(json!({ "message": "Chaos initiated" })))
}
