//! Order payload types
//!
//! The diner and order bodies are caller-supplied JSON that the factory signs
//! into a token verbatim. Only the item count is inspected; everything else
//! round-trips untouched through issuance and verification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of line items a single order may carry.
pub const MAX_ORDER_ITEMS: usize = 20;

/// The order half of a token payload.
///
/// `items` is the only field the factory interprets; any other fields the
/// caller sends (store id, franchise id, order id, ...) are preserved via the
/// flattened map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderPayload {
    /// Whether the item count is within the 1..=20 issuance bounds.
    pub fn item_count_in_bounds(&self) -> bool {
        (1..=MAX_ORDER_ITEMS).contains(&self.items.len())
    }
}

/// Whether a caller-supplied diner body counts as present.
///
/// Missing, `null`, and `{}` are all treated as absent.
pub fn diner_present(diner: &Value) -> bool {
    match diner {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
