//! Per-user trust settings.

use serde::{Deserialize, Serialize};

use crate::config::validate_days;
use crate::error::Result;

/// Trust settings for a single user, persisted by a
/// [`TrustSettingsStore`](crate::storage::TrustSettingsStore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSettings {
    /// Days this user's agents remain trusted. `None` for no user limit.
    pub trust_days: Option<f64>,
    /// Days a sealed token may sit unused. `None` defers to the global cap.
    pub inactivity_days: Option<f64>,
    /// Increment to revoke every previously trusted agent.
    pub serial: i64,
}

impl TrustSettings {
    pub fn with_trust_days(mut self, days: Option<f64>) -> Self {
        self.trust_days = days;
        self
    }

    pub fn with_inactivity_days(mut self, days: Option<f64>) -> Self {
        self.inactivity_days = days;
        self
    }

    pub fn with_serial(mut self, serial: i64) -> Self {
        self.serial = serial;
        self
    }

    /// Reject negative or non-finite day counts before they are persisted.
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = self.trust_days {
            validate_days("trust_days", days)?;
        }
        if let Some(days) = self.inactivity_days {
            validate_days("inactivity_days", days)?;
        }
        Ok(())
    }
}
