//! Process-wide trust configuration.
//!
//! Loaded once at startup and handed to the evaluator. A misconfigured
//! inactivity window must abort startup, so every loader validates.
//!
//! ```json
//! {
//!   "trust_days": 30,
//!   "inactivity_days": 90,
//!   "login_url": "/accounts/verify/",
//!   "transport": { "cookie_name": "agent-trust", "secure": true }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

/// Default global inactivity cap, in days.
pub const DEFAULT_INACTIVITY_DAYS: f64 = 365.0;

/// Default base name of the per-user transport channel.
pub const DEFAULT_COOKIE_NAME: &str = "agent-trust";

/// Default redirect target for agents that fail the trust guard.
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login/";

/// Global trust policy and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrustConfig {
    /// Global maximum trust duration in days. `None` for no global limit.
    pub trust_days: Option<f64>,
    /// Global maximum idle age of the transport token, in days.
    pub inactivity_days: f64,
    /// Where the trust guard sends untrusted agents.
    pub login_url: String,
    /// Pass-through transport attributes.
    pub transport: TransportOptions,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            trust_days: None,
            inactivity_days: DEFAULT_INACTIVITY_DAYS,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            transport: TransportOptions::default(),
        }
    }
}

/// Cookie-style attributes the web layer attaches to the sealed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportOptions {
    pub cookie_name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

impl TrustConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrustError::Configuration(format!("invalid trust config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrustError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Check that every numeric limit is a finite, non-negative day count.
    pub fn validate(&self) -> Result<()> {
        validate_days("inactivity_days", self.inactivity_days)?;
        if let Some(days) = self.trust_days {
            validate_days("trust_days", days)?;
        }
        if self.transport.cookie_name.is_empty() {
            return Err(TrustError::Configuration(
                "transport.cookie_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_days(name: &str, days: f64) -> Result<()> {
    if !days.is_finite() || days < 0.0 {
        return Err(TrustError::Configuration(format!(
            "{name} must be a non-negative number of days, got {days}"
        )));
    }
    Ok(())
}
