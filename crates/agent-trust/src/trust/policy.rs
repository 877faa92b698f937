//! Policy resolution: combine overlapping limits, most restrictive wins.
//!
//! Two independent limits exist:
//! - trust TTL: how long an explicit grant lasts (global, user, token);
//! - inactivity: how long the sealed transport token may sit unused
//!   (global, user). Enforced by the channel, not by the token.

use chrono::TimeDelta;

use crate::config::validate_days;
use crate::error::Result;
use crate::time;

use super::settings::TrustSettings;

/// Minimum of the TTL sources that are present; `None` means unlimited.
pub fn resolve_ttl(global: Option<f64>, user: Option<f64>, token: Option<f64>) -> Option<f64> {
    [global, user, token].into_iter().flatten().reduce(f64::min)
}

/// Effective inactivity cap in days.
///
/// # Errors
///
/// `TrustError::Configuration` if `global_default` is negative or not finite.
pub fn resolve_inactivity(global_default: f64, user: Option<f64>) -> Result<f64> {
    validate_days("inactivity_days", global_default)?;

    Ok(match user {
        Some(days) if days < global_default => days,
        _ => global_default,
    })
}

/// Transport max-age for the given global default and user settings.
pub fn inactivity_max_age(global_default: f64, settings: &TrustSettings) -> Result<TimeDelta> {
    let days = resolve_inactivity(global_default, settings.inactivity_days)?;
    Ok(TimeDelta::try_seconds(time::days_to_seconds(days)).unwrap_or_else(TimeDelta::zero))
}
