//! Trust tokens: one agent's trust claim as an immutable value.
//!
//! A token is never changed in place. Granting, revoking or re-stamping
//! trust always produces a new token that replaces the old one.

use chrono::{DateTime, Utc};

use crate::error::{Result, TrustError};
use crate::identity::Principal;
use crate::time;

use super::policy::resolve_ttl;
use super::record::TrustRecord;
use super::settings::TrustSettings;

/// Serial carried by tokens that were never trusted.
pub const UNTRUSTED_SERIAL: i64 = -1;

/// Trust state of one agent for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustToken {
    owner: Principal,
    is_trusted: bool,
    trusted_at: Option<DateTime<Utc>>,
    trust_days: Option<f64>,
    serial: i64,
    session: Option<String>,
}

impl TrustToken {
    fn new(
        owner: Principal,
        is_trusted: bool,
        trusted_at: Option<DateTime<Utc>>,
        trust_days: Option<f64>,
        serial: i64,
        session: Option<String>,
    ) -> Self {
        Self {
            owner,
            is_trusted,
            trusted_at: trusted_at.map(time::truncate_to_seconds),
            trust_days,
            serial,
            session,
        }
    }

    /// The canonical untrusted token.
    pub fn untrusted(owner: Principal) -> Self {
        Self::new(owner, false, None, None, UNTRUSTED_SERIAL, None)
    }

    /// Trust the agent as of `now`, optionally capped at `trust_days`.
    ///
    /// # Errors
    ///
    /// `TrustError::InvalidOperation` if `owner` is anonymous or
    /// `trust_days` is negative or not finite.
    pub fn trusted(
        owner: Principal,
        settings: &TrustSettings,
        trust_days: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        require_authenticated(&owner)?;
        if let Some(days) = trust_days {
            if !days.is_finite() || days < 0.0 {
                return Err(TrustError::InvalidOperation(format!(
                    "trust_days must be a non-negative number, got {days}"
                )));
            }
        }
        Ok(Self::new(
            owner,
            true,
            Some(now),
            trust_days,
            settings.serial,
            None,
        ))
    }

    /// Trust the agent for as long as the session carrying `session_token`
    /// lasts. Every expiration setting and revocation still applies.
    ///
    /// # Errors
    ///
    /// `TrustError::InvalidOperation` if `owner` is anonymous.
    pub fn session_trusted(
        owner: Principal,
        settings: &TrustSettings,
        session_token: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        require_authenticated(&owner)?;
        Ok(Self::new(
            owner,
            true,
            Some(now),
            None,
            settings.serial,
            Some(session_token.into()),
        ))
    }

    /// A copy of this token stamped with a different serial.
    pub fn with_serial(&self, serial: i64) -> Self {
        Self {
            serial,
            ..self.clone()
        }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// `true` if this agent has been marked as trusted.
    pub fn is_trusted(&self) -> bool {
        self.is_trusted
    }

    /// `true` if this agent is only trusted for the current session.
    pub fn is_session(&self) -> bool {
        self.session.is_some()
    }

    /// When this agent was last explicitly trusted, if ever.
    pub fn trusted_at(&self) -> Option<DateTime<Utc>> {
        self.trusted_at
    }

    pub fn trust_days(&self) -> Option<f64> {
        self.trust_days
    }

    pub fn serial(&self) -> i64 {
        self.serial
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// The instant trust in this agent expires.
    ///
    /// `None` if the agent is not trusted or no TTL source applies.
    pub fn trust_expiration(
        &self,
        global_trust_days: Option<f64>,
        settings: &TrustSettings,
    ) -> Option<DateTime<Utc>> {
        if !self.is_trusted {
            return None;
        }
        let trusted_at = self.trusted_at?;
        let ttl = resolve_ttl(global_trust_days, settings.trust_days, self.trust_days)?;

        Some(time::add_saturating(trusted_at, time::days(ttl)))
    }

    /// Whether the trust expiration lies strictly before `now`.
    pub fn is_expired_at(
        &self,
        global_trust_days: Option<f64>,
        settings: &TrustSettings,
        now: DateTime<Utc>,
    ) -> bool {
        self.trust_expiration(global_trust_days, settings)
            .is_some_and(|expiration| expiration < now)
    }

    /// Convert to the portable wire record.
    pub fn to_record(&self) -> TrustRecord {
        TrustRecord {
            username: self.owner.user_id().map(|id| id.0.clone()),
            is_trusted: self.is_trusted,
            trusted_at: self.trusted_at.map(time::to_epoch_seconds),
            trust_days: self.trust_days,
            serial: self.serial,
            session: self.session.clone(),
        }
    }

    /// Rebuild a token from a wire record on behalf of `owner`.
    ///
    /// Does not compare the record's `username` with `owner`; that check
    /// belongs to the evaluator.
    ///
    /// # Errors
    ///
    /// `TrustError::Decode` if `trusted_at` is out of range.
    pub fn from_record(record: &TrustRecord, owner: Principal) -> Result<Self> {
        let trusted_at = record
            .trusted_at
            .map(|secs| {
                time::from_epoch_seconds(secs)
                    .ok_or_else(|| TrustError::Decode(format!("trusted_at out of range: {secs}")))
            })
            .transpose()?;

        Ok(Self::new(
            owner,
            record.is_trusted,
            trusted_at,
            record.trust_days,
            record.serial,
            record.session.clone(),
        ))
    }
}

fn require_authenticated(owner: &Principal) -> Result<()> {
    if owner.is_authenticated() {
        Ok(())
    } else {
        Err(TrustError::InvalidOperation(
            "cannot trust an agent for an anonymous user".into(),
        ))
    }
}
