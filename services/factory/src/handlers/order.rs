//! Order issuance and verification handlers
//!
//! The issuance path consults the caller's chaos state before anything else,
//! mirroring the fault a client under test is supposed to detect. The
//! verification path is store-free by design.

use crate::auth::AuthVendor;
use crate::chaos::{self, ChaosDecision, CORRUPT_JWT, FAIL_MESSAGE};
use crate::error::AppError;
use crate::keys::Jwks;
use crate::state::AppState;
use crate::token;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use types::order::{diner_present, OrderPayload};

/// Message returned when the item count is out of bounds.
pub const OVEN_FULL: &str = "Unable to satisfy pizza order. The oven is full.";

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub diner: Value,
    pub order: Option<OrderPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub jwt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub jwt: Option<String>,
}

pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthVendor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, AppError> {
    // 1. Chaos interception, before any validation
    let mut report_url = None;
    match chaos::evaluate(&auth.vendor, &state.config.base_url) {
        ChaosDecision::Proceed => {}
        ChaosDecision::ProceedDelayed { report_url: url } => {
            tokio::time::sleep(state.config.order_delay).await;
            report_url = Some(url);
        }
        ChaosDecision::CorruptToken { report_url } => {
            return Ok(Json(OrderResponse {
                jwt: CORRUPT_JWT.to_owned(),
                report_url: Some(report_url),
            })
            .into_response());
        }
        ChaosDecision::Fail { report_url } => {
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": FAIL_MESSAGE, "reportUrl": report_url })),
            )
                .into_response());
        }
    }

    // 2. Validation
    let Some(order) = payload.order else {
        return Err(AppError::BadRequest("Missing required parameters".into()));
    };
    if !diner_present(&payload.diner) {
        return Err(AppError::BadRequest("Missing required parameters".into()));
    }
    if !order.item_count_in_bounds() {
        // The kitchen-is-busy path: hold the caller for the full delay first
        tokio::time::sleep(state.config.order_delay).await;
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": OVEN_FULL })),
        )
            .into_response());
    }

    // 3. Sign
    let jwt = token::issue(
        &state.keys,
        &auth.vendor.descriptor(),
        payload.diner,
        order,
    )?;

    tracing::info!(vendor = %auth.vendor.id, "order token issued");
    Ok(Json(OrderResponse { jwt, report_url }).into_response())
}

pub async fn verify_order(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Response {
    let verified = payload
        .jwt
        .as_deref()
        .ok_or(token::TokenError::Invalid)
        .and_then(|jwt| token::verify(&state.keys, jwt));

    match verified {
        Ok(claims) => (
            StatusCode::OK,
            Json(json!({ "message": "valid", "payload": claims })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "invalid" })),
        )
            .into_response(),
    }
}

pub async fn jwks(State(state): State<AppState>) -> Json<Jwks> {
    Json(state.keys.jwks().clone())
}
