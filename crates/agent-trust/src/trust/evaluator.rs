//! Trust evaluator: decode the inbound token, encode the outbound one.
//!
//! Decoding never fails from the caller's point of view: any channel,
//! parse or identity problem yields an untrusted token, exactly as if the
//! agent had never been trusted. [`TrustEvaluator::try_load`] exposes the
//! reason for diagnostics.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, warn};
use serde::Serialize;

use crate::channel::{channel_name, SealedChannel};
use crate::config::TrustConfig;
use crate::error::{Result, TrustError};
use crate::identity::{Principal, UserId};

use super::policy::inactivity_max_age;
use super::record::TrustRecord;
use super::settings::TrustSettings;
use super::token::TrustToken;
use super::verify::{verify_token, TokenVerification};

/// A sealed token plus the transport attributes the web layer attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealedToken {
    /// Per-user channel (cookie) name.
    pub name: String,
    /// Opaque sealed value.
    pub value: String,
    /// Transport max-age in seconds.
    pub max_age: i64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

/// Turns sealed transport values into trust tokens and back.
pub struct TrustEvaluator<C> {
    config: TrustConfig,
    channel: C,
}

impl<C: SealedChannel> TrustEvaluator<C> {
    /// Build an evaluator.
    ///
    /// # Errors
    ///
    /// `TrustError::Configuration` if `config` does not validate.
    pub fn new(config: TrustConfig, channel: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, channel })
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Name of the transport channel carrying `user`'s token.
    pub fn channel_name(&self, user: &UserId) -> String {
        channel_name(&self.config.transport.cookie_name, user)
    }

    /// Effective transport max-age for a user.
    pub fn max_transport_age(&self, settings: &TrustSettings) -> Result<TimeDelta> {
        inactivity_max_age(self.config.inactivity_days, settings)
    }

    /// Decode and verify an inbound sealed value, reporting why it failed.
    ///
    /// An absent value verifies as the canonical untrusted token.
    ///
    /// # Errors
    ///
    /// Channel failures, `TrustError::Decode` and `TrustError::CrossIdentity`.
    pub fn try_load(
        &self,
        raw: Option<&str>,
        owner: &Principal,
        settings: &TrustSettings,
        ambient_session: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenVerification> {
        let (Some(user), Some(raw)) = (owner.user_id(), raw) else {
            return Ok(self.verify(
                TrustToken::untrusted(owner.clone()),
                settings,
                ambient_session,
                now,
            ));
        };

        let max_age = self.max_transport_age(settings)?;
        let payload = self
            .channel
            .unseal(&self.channel_name(user), raw, max_age, now)?;
        let record = TrustRecord::from_json(&payload)?;

        debug!("Decoded trust record: {record:?}");

        if record.username.as_deref() != Some(user.as_str()) {
            return Err(TrustError::CrossIdentity {
                expected: user.to_string(),
                found: record.username,
            });
        }

        let token = TrustToken::from_record(&record, owner.clone())?;
        Ok(self.verify(token, settings, ambient_session, now))
    }

    /// Effective trust token for this request. Never fails.
    pub fn load(
        &self,
        raw: Option<&str>,
        owner: &Principal,
        settings: &TrustSettings,
        ambient_session: Option<&str>,
        now: DateTime<Utc>,
    ) -> TrustToken {
        let token = match self.try_load(raw, owner, settings, ambient_session, now) {
            Ok(verification) => {
                if !verification.is_valid && verification.token.is_trusted() {
                    debug!(
                        "Discarding agent for {owner}: not_expired={}, not_revoked={}, session_valid={}",
                        verification.not_expired,
                        verification.not_revoked,
                        verification.session_valid
                    );
                }
                verification.effective_token()
            }
            Err(e @ TrustError::CrossIdentity { .. }) => {
                warn!("Rejecting trust token: {e}");
                TrustToken::untrusted(owner.clone())
            }
            Err(e) if e.is_recoverable() => {
                debug!("Ignoring unreadable trust token for {owner}: {e}");
                TrustToken::untrusted(owner.clone())
            }
            Err(e) => {
                error!("Trust evaluation failed for {owner}: {e}");
                TrustToken::untrusted(owner.clone())
            }
        };

        debug!(
            "Loaded agent: username={owner}, is_trusted={}, trusted_at={:?}, serial={}",
            token.is_trusted(),
            token.trusted_at(),
            token.serial()
        );

        token
    }

    /// Seal `token` for the response.
    ///
    /// Returns `None` for anonymous owners, which have nothing to persist.
    pub fn store(
        &self,
        token: &TrustToken,
        settings: &TrustSettings,
        now: DateTime<Utc>,
    ) -> Result<Option<SealedToken>> {
        let Some(user) = token.owner().user_id() else {
            return Ok(None);
        };

        debug!(
            "Saving agent: username={user}, is_trusted={}, trusted_at={:?}, serial={}",
            token.is_trusted(),
            token.trusted_at(),
            token.serial()
        );

        let max_age = self.max_transport_age(settings)?;
        let payload = token.to_record().to_json()?;
        let name = self.channel_name(user);
        let value = self.channel.seal(&name, &payload, max_age, now)?;
        let transport = &self.config.transport;

        Ok(Some(SealedToken {
            name,
            value,
            max_age: max_age.num_seconds(),
            path: transport.path.clone(),
            domain: transport.domain.clone(),
            secure: transport.secure,
            http_only: transport.http_only,
        }))
    }

    fn verify(
        &self,
        token: TrustToken,
        settings: &TrustSettings,
        ambient_session: Option<&str>,
        now: DateTime<Utc>,
    ) -> TokenVerification {
        verify_token(
            token,
            self.config.trust_days,
            settings,
            ambient_session,
            now,
        )
    }
}
