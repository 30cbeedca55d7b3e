//! Bearer-credential extractors
//!
//! Resolves the `Authorization` header to a full vendor record through the
//! store and threads it into handlers as an explicit value. Unknown, missing,
//! and malformed credentials all collapse into the same 401 so callers learn
//! nothing about which part failed.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use types::ids::ApiKey;
use types::vendor::Vendor;

/// Strip an optional case-insensitive `Bearer ` prefix.
fn bearer_token(header: &str) -> &str {
    match header.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => header[7..].trim(),
        _ => header.trim(),
    }
}

/// The authenticated caller.
pub struct AuthVendor {
    pub vendor: Vendor,
}

impl FromRequestParts<AppState> for AuthVendor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let token = bearer_token(header);
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let api_key = ApiKey::from(token);
        match state.store.vendor_by_api_key(&api_key).await? {
            Some(vendor) => Ok(Self { vendor }),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// An authenticated caller holding the admin role.
pub struct AuthAdmin {
    pub vendor: Vendor,
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthVendor { vendor } = AuthVendor::from_request_parts(parts, state).await?;
        if !vendor.is_admin() {
            return Err(AppError::Unauthorized);
        }
        Ok(Self { vendor })
    }
}
