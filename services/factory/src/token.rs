//! Token issuance and verification
//!
//! Builds and signs the compact order token (EdDSA, three base64url segments)
//! and independently verifies any such token. Verification needs only the
//! public key, never the vendor store, so a third party holding the JWKS
//! document can run the same check.

use crate::keys::KeyMaterial;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use types::order::OrderPayload;
use types::vendor::VendorDescriptor;

/// Fixed issuer claim stamped into every token.
pub const TOKEN_ISSUER: &str = "pizza-factory";

/// Tokens expire exactly 24 hours after issuance.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed (key unavailable or unusable). Surfaces as a server
    /// error to the caller.
    #[error("unable to process order")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Any structural or cryptographic verification failure. Deliberately
    /// carries no detail about which check failed.
    #[error("invalid")]
    Invalid,
}

/// Claims carried by an order token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderClaims {
    pub vendor: VendorDescriptor,
    pub diner: Value,
    pub order: OrderPayload,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Sign an order into a compact token.
pub fn issue(
    keys: &KeyMaterial,
    vendor: &VendorDescriptor,
    diner: Value,
    order: OrderPayload,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = OrderClaims {
        vendor: vendor.clone(),
        diner,
        order,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
        iss: TOKEN_ISSUER.to_owned(),
    };

    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(keys.kid().to_owned());

    encode(&header, &claims, keys.encoding()).map_err(TokenError::Signing)
}

/// Verify a compact token and return its payload.
///
/// All failure modes (garbled structure, bad signature, wrong issuer,
/// expired) collapse into the uniform [`TokenError::Invalid`].
pub fn verify(keys: &KeyMaterial, token: &str) -> Result<Value, TokenError> {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss"]);

    decode::<Value>(token, keys.decoding(), &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::test_support::generated_pems;
    use serde_json::json;
    use types::order::OrderPayload;

    fn test_keys() -> KeyMaterial {
        let (private_pem, public_pem) = generated_pems();
        KeyMaterial::from_pems(&private_pem, &public_pem).unwrap()
    }

    fn sample_vendor() -> VendorDescriptor {
        VendorDescriptor {
            id: "v1".to_owned(),
            name: Some("Test vendor".to_owned()),
        }
    }

    fn sample_order(items: usize) -> OrderPayload {
        let raw = json!({
            "items": (0..items)
                .map(|i| json!({"menuId": i, "description": "Veggie", "price": 0.0038}))
                .collect::<Vec<_>>(),
            "storeId": "5",
            "franchiseId": 4,
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_round_trip_reproduces_payload() {
        let keys = test_keys();
        let diner = json!({"id": 719, "name": "j", "email": "j@jwt.com"});
        let order = sample_order(3);

        let token = issue(&keys, &sample_vendor(), diner.clone(), order.clone()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let payload = verify(&keys, &token).unwrap();
        assert_eq!(payload["vendor"], json!({"id": "v1", "name": "Test vendor"}));
        assert_eq!(payload["diner"], diner);
        assert_eq!(payload["order"], serde_json::to_value(&order).unwrap());
        assert_eq!(payload["iss"], TOKEN_ISSUER);
        assert_eq!(
            payload["exp"].as_i64().unwrap() - payload["iat"].as_i64().unwrap(),
            TOKEN_TTL_SECS
        );
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let keys = test_keys();
        let token = issue(
            &keys,
            &sample_vendor(),
            json!({"name": "j"}),
            sample_order(1),
        )
        .unwrap();

        // Flip a character in each segment (header, payload, signature).
        let dots: Vec<usize> = token
            .char_indices()
            .filter(|(_, c)| *c == '.')
            .map(|(i, _)| i)
            .collect();
        for pos in [1, dots[0] + 2, dots[1] + 2] {
            let mut bytes = token.clone().into_bytes();
            bytes[pos] = if bytes[pos] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert!(
                verify(&keys, &tampered).is_err(),
                "tampering at byte {pos} should invalidate the token"
            );
        }
    }

    #[test]
    fn test_garbage_is_invalid() {
        let keys = test_keys();
        assert!(verify(&keys, "").is_err());
        assert!(verify(&keys, "not.a.token").is_err());
        assert!(verify(&keys, "a.b").is_err());
    }

    #[test]
    fn test_foreign_key_is_invalid() {
        let keys = test_keys();
        let other = test_keys();
        let token = issue(
            &keys,
            &sample_vendor(),
            json!({"name": "j"}),
            sample_order(1),
        )
        .unwrap();
        assert!(verify(&other, &token).is_err());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let claims = OrderClaims {
            vendor: sample_vendor(),
            diner: json!({"name": "j"}),
            order: sample_order(1),
            iat: now - TOKEN_TTL_SECS - 600,
            exp: now - 600,
            iss: TOKEN_ISSUER.to_owned(),
        };
        let header = Header::new(Algorithm::EdDSA);
        let token = encode(&header, &claims, keys.encoding()).unwrap();
        assert!(verify(&keys, &token).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let claims = OrderClaims {
            vendor: sample_vendor(),
            diner: json!({"name": "j"}),
            order: sample_order(1),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
            iss: "somewhere-else".to_owned(),
        };
        let header = Header::new(Algorithm::EdDSA);
        let token = encode(&header, &claims, keys.encoding()).unwrap();
        assert!(verify(&keys, &token).is_err());
    }
}
