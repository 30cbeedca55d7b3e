//! Peer-pairing records
//!
//! A connection links two vendors that both asked to be paired for the same
//! purpose. One row per `(requester, purpose)`; the partner side is `None`
//! while the request is still waiting.

use serde::{Deserialize, Serialize};

/// A vendor's view of one pairing, keyed by purpose.
///
/// `id` is the partner's vendor id once the pairing is fulfilled and `None`
/// while waiting. Contact fields are the partner's public profile fields,
/// copied into the view so the caller can reach out directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl ConnectionView {
    /// A request that has not been matched yet.
    pub fn waiting(purpose: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            email: None,
            phone: None,
            website: None,
            purpose: purpose.into(),
            rating: None,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.id.is_some()
    }
}

/// Rating bounds for fulfilled pairings.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Whether a rating value is acceptable.
pub fn rating_in_bounds(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
