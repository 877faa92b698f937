//! Token verification: should a decoded token survive this request?
//!
//! Verification checks:
//! 1. Expiration (the resolved trust TTL has not elapsed)
//! 2. Revocation (token serial is not behind the owner's serial)
//! 3. Session binding (session-scoped tokens match the ambient session)

use chrono::{DateTime, Utc};

use super::settings::TrustSettings;
use super::token::TrustToken;

/// Result of verifying a decoded token.
#[derive(Debug, Clone)]
pub struct TokenVerification {
    /// The token as decoded, before any discard.
    pub token: TrustToken,
    /// Resolved trust expiration, if any.
    pub expiration: Option<DateTime<Utc>>,
    /// Has the trust TTL not yet elapsed?
    pub not_expired: bool,
    /// Is the serial current?
    pub not_revoked: bool,
    /// Does the session binding (if any) still hold?
    pub session_valid: bool,
    /// Overall: keep the token rather than fall back to untrusted.
    pub is_valid: bool,
}

impl TokenVerification {
    /// The token to use for the rest of the request.
    pub fn effective_token(&self) -> TrustToken {
        if self.is_valid {
            self.token.clone()
        } else {
            TrustToken::untrusted(self.token.owner().clone())
        }
    }
}

/// Verify `token` against the owner's settings and the ambient session.
pub fn verify_token(
    token: TrustToken,
    global_trust_days: Option<f64>,
    settings: &TrustSettings,
    ambient_session: Option<&str>,
    now: DateTime<Utc>,
) -> TokenVerification {
    let expiration = token.trust_expiration(global_trust_days, settings);
    let not_expired = expiration.map_or(true, |at| at >= now);
    let not_revoked = token.serial() >= settings.serial;
    let session_valid = match token.session() {
        Some(bound) => ambient_session == Some(bound),
        None => true,
    };

    TokenVerification {
        token,
        expiration,
        not_expired,
        not_revoked,
        session_valid,
        is_valid: not_expired && not_revoked && session_valid,
    }
}
