//! JWT pizza factory service
//!
//! Issues cryptographically signed order tokens on behalf of registered
//! vendors, deliberately injects simulated faults into the issuance path so
//! client implementations can be tested against a lying, slow, or failing
//! server, and brokers one-time pairings between vendors.
//!
//! # Modules
//! - `keys`: Ed25519 key material and the published JWKS document
//! - `token`: compact token issuance and verification
//! - `chaos`: per-vendor fault-injection decisions
//! - `store`: SQLite-backed vendor/chaos/connection store
//! - `auth`: bearer-credential extractors
//! - `handlers` / `router`: the HTTP surface

pub mod auth;
pub mod chaos;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod notify;
pub mod router;
pub mod state;
pub mod store;
pub mod token;
