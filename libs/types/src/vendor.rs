//! Vendor records and roles

use crate::chaos::Chaos;
use crate::connection::ConnectionView;
use crate::ids::ApiKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Roles a vendor can hold. Every vendor implicitly has `Vendor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered vendor.
///
/// The full record as assembled from the store: identity and contact fields
/// plus the joined chaos state and connection views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: String,
    pub api_key: ApiKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub created: DateTime<Utc>,
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaos: Option<Chaos>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub connections: HashMap<String, ConnectionView>,
}

impl Vendor {
    /// Create a fresh vendor with a newly minted API key and the default role.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_key: ApiKey::generate(),
            name: None,
            email: None,
            phone: None,
            website: None,
            created: Utc::now(),
            roles: vec![Role::Vendor],
            chaos: None,
            connections: HashMap::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// The minimal descriptor embedded in signed tokens.
    pub fn descriptor(&self) -> VendorDescriptor {
        VendorDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Strip the live fix code before handing the record to its owner.
    pub fn redacted(mut self) -> Self {
        self.chaos = self.chaos.map(Chaos::redacted);
        self
    }
}

/// Minimal vendor descriptor for token payloads (never the full record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDescriptor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
