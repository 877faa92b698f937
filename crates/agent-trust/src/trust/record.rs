//! Portable trust record: the wire form of a [`TrustToken`](super::TrustToken).
//!
//! ```json
//! {
//!   "username": "alice",
//!   "is_trusted": true,
//!   "trusted_at": 1700000000,
//!   "trust_days": null,
//!   "serial": 3,
//!   "session": null
//! }
//! ```
//!
//! A missing key and an explicit `null` decode identically. Missing
//! `is_trusted` means untrusted and missing `serial` means never trusted.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TrustError};

use super::token::UNTRUSTED_SERIAL;

/// Serialized trust claim carried inside the sealed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustRecord {
    /// Stable identity string of the owner, never a display name.
    pub username: Option<String>,
    #[serde(deserialize_with = "null_as_false")]
    pub is_trusted: bool,
    /// Seconds since the Unix epoch.
    pub trusted_at: Option<i64>,
    pub trust_days: Option<f64>,
    #[serde(deserialize_with = "null_as_untrusted_serial")]
    pub serial: i64,
    pub session: Option<String>,
}

impl Default for TrustRecord {
    fn default() -> Self {
        Self {
            username: None,
            is_trusted: false,
            trusted_at: None,
            trust_days: None,
            serial: UNTRUSTED_SERIAL,
            session: None,
        }
    }
}

impl TrustRecord {
    /// Compact JSON encoding.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TrustError::Serialization(e.to_string()))
    }

    /// Parse a JSON object.
    ///
    /// # Errors
    ///
    /// `TrustError::Decode` for invalid JSON, anything but an object, or
    /// mistyped fields.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| TrustError::Decode(e.to_string()))?;
        if !value.is_object() {
            return Err(TrustError::Decode("trust record is not a JSON object".into()));
        }
        serde_json::from_value(value).map_err(|e| TrustError::Decode(e.to_string()))
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

fn null_as_untrusted_serial<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(d)?.unwrap_or(UNTRUSTED_SERIAL))
}
