//! Opaque credential types for factory entities
//!
//! Vendors are identified by an external, human-chosen id string; the types
//! here cover the credentials the factory itself mints: the bearer `ApiKey`
//! and the single-use `FixCode` that clears an active chaos state. Both are
//! generated from random UUIDs rather than time-sortable ones because they
//! act as secrets, not sort keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a short random code (8 hex characters).
///
/// Used for fix codes and login codes, where the value only has to be
/// unguessable for the lifetime of a single challenge.
pub fn short_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Bearer credential identifying a vendor.
///
/// Presented as `Authorization: Bearer <key>` on authenticated calls and
/// embedded in chaos report URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Mint a fresh API key (32 hex characters).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Single-use challenge secret for clearing an active chaos state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixCode(String);

impl FixCode {
    /// Mint a fresh fix code.
    pub fn generate() -> Self {
        Self(short_code())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FixCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FixCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
