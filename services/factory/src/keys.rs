//! Key material holder
//!
//! Loads one Ed25519 key pair from PEM files at startup and exposes the
//! private half for signing, the public half for verification, and a JWKS
//! document for third parties that want to verify tokens on their own.
//! Loading happens before the listener is bound; a parse failure is fatal.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::VerifyingKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse key material: {0}")]
    Parse(String),
}

/// Published JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A single Ed25519 public key in JWK form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub x: String,
}

/// The loaded signing key pair plus derived verification artifacts.
pub struct KeyMaterial {
    encoding: EncodingKey,
    decoding: DecodingKey,
    kid: String,
    jwks: Jwks,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Load the key pair from PEM files (private PKCS#8, public SPKI).
    pub fn load(private_path: &Path, public_path: &Path) -> Result<Self, KeyError> {
        let private_pem = std::fs::read(private_path).map_err(|source| KeyError::Read {
            path: private_path.to_owned(),
            source,
        })?;
        let public_pem =
            std::fs::read_to_string(public_path).map_err(|source| KeyError::Read {
                path: public_path.to_owned(),
                source,
            })?;
        Self::from_pems(&private_pem, &public_pem)
    }

    /// Build key material from in-memory PEM documents.
    pub fn from_pems(private_pem: &[u8], public_pem: &str) -> Result<Self, KeyError> {
        let encoding = EncodingKey::from_ed_pem(private_pem)
            .map_err(|err| KeyError::Parse(err.to_string()))?;
        let decoding = DecodingKey::from_ed_pem(public_pem.as_bytes())
            .map_err(|err| KeyError::Parse(err.to_string()))?;

        // The raw public key bytes feed both the JWKS `x` member and the kid.
        let verifying = VerifyingKey::from_public_key_pem(public_pem)
            .map_err(|err| KeyError::Parse(err.to_string()))?;
        let raw = verifying.to_bytes();

        let digest = Sha256::digest(raw);
        let kid = URL_SAFE_NO_PAD.encode(digest)[..16].to_owned();

        let jwks = Jwks {
            keys: vec![Jwk {
                kty: "OKP".to_owned(),
                crv: "Ed25519".to_owned(),
                alg: "EdDSA".to_owned(),
                key_use: "sig".to_owned(),
                kid: kid.clone(),
                x: URL_SAFE_NO_PAD.encode(raw),
            }],
        };

        Ok(Self {
            encoding,
            decoding,
            kid,
            jwks,
        })
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn jwks(&self) -> &Jwks {
        &self.jwks
    }
}
