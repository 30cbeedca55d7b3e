//! Fault-injection ("chaos") state
//!
//! Each vendor owns at most one chaos record. A non-`none` kind changes how
//! token issuance behaves for that vendor until the matching fix code is
//! presented at the support endpoint, which transitions the record back to
//! `none` and consumes the code.

use crate::ids::FixCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The chaos kinds a vendor can request.
///
/// `BadJwt` replaces the issued token with garbage, `Throttle` delays
/// issuance, `Fail` short-circuits it with a server error. `None` is the
/// resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosKind {
    None,
    #[serde(rename = "badjwt")]
    BadJwt,
    Throttle,
    Fail,
}

impl ChaosKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaosKind::None => "none",
            ChaosKind::BadJwt => "badjwt",
            ChaosKind::Throttle => "throttle",
            ChaosKind::Fail => "fail",
        }
    }

    /// Kinds a vendor may request through the chaos endpoint.
    pub fn is_injectable(&self) -> bool {
        !matches!(self, ChaosKind::None)
    }
}

impl fmt::Display for ChaosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognized chaos kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chaos kind: {0}")]
pub struct UnknownChaosKind(pub String);

impl FromStr for ChaosKind {
    type Err = UnknownChaosKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ChaosKind::None),
            "badjwt" => Ok(ChaosKind::BadJwt),
            "throttle" => Ok(ChaosKind::Throttle),
            "fail" => Ok(ChaosKind::Fail),
            other => Err(UnknownChaosKind(other.to_owned())),
        }
    }
}

/// A vendor's chaos record.
///
/// Invariant: `fix_code` is `Some` exactly while `kind != None`. The code is
/// single-use; resolution clears it and stamps `fix_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chaos {
    #[serde(rename = "type")]
    pub kind: ChaosKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_code: Option<FixCode>,
    pub initiated_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_date: Option<DateTime<Utc>>,
}

impl Chaos {
    /// Start (or restart) a fault of the given kind with a fresh fix code.
    pub fn inject(kind: ChaosKind) -> Self {
        Self {
            kind,
            fix_code: Some(FixCode::generate()),
            initiated_date: Utc::now(),
            fix_date: None,
        }
    }

    /// Whether this record currently alters token issuance.
    pub fn is_active(&self) -> bool {
        self.kind != ChaosKind::None
    }

    /// Clear the fault: kind back to `none`, code consumed, fix date stamped.
    pub fn resolve(&mut self) {
        self.kind = ChaosKind::None;
        self.fix_code = None;
        self.fix_date = Some(Utc::now());
    }

    /// Drop the fix code from an otherwise intact record, for responses that
    /// must not leak the challenge secret.
    pub fn redacted(mut self) -> Self {
        self.fix_code = None;
        self
    }

    /// The `fix_code`-iff-active invariant.
    pub fn invariant_holds(&self) -> bool {
        self.is_active() == self.fix_code.is_some()
    }
}
