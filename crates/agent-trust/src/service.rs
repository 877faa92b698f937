//! Request-level trust operations.
//!
//! [`AgentTrust`] ties the evaluator to a settings store. A web layer calls
//! [`AgentTrust::begin`] when a request arrives, any of the trust
//! operations while handling it, and [`AgentTrust::finish`] to get the
//! sealed token to attach to the response.
//!
//! ```no_run
//! use agent_trust::channel::{ChannelSecret, HmacChannel};
//! use agent_trust::storage::{MemorySession, MemorySettingsStore};
//! use agent_trust::{time, AgentTrust, Principal, TrustConfig};
//!
//! let secret = ChannelSecret::generate();
//! let trust = AgentTrust::new(
//!     TrustConfig::default(),
//!     HmacChannel::new(secret),
//!     MemorySettingsStore::new(),
//! )?;
//!
//! let session = MemorySession::new();
//! let mut ctx = trust.begin(Principal::user("alice"), None, &session, time::now())?;
//! trust.trust(&mut ctx, Some(30.0), time::now())?;
//! let sealed = trust.finish(&ctx, time::now())?;
//! # Ok::<(), agent_trust::TrustError>(())
//! ```

use chrono::{DateTime, Utc};
use log::debug;

use crate::channel::SealedChannel;
use crate::config::TrustConfig;
use crate::crypto::random;
use crate::error::Result;
use crate::identity::{Principal, UserId};
use crate::storage::{SessionStore, TrustSettingsStore, SESSION_TOKEN_KEY};
use crate::trust::{
    is_trusted, LoginRedirect, SealedToken, TrustEvaluator, TrustGuard, TrustSettings, TrustToken,
};

/// Trust state of the agent making the current request.
#[derive(Debug, Clone)]
pub struct AgentContext {
    principal: Principal,
    settings: TrustSettings,
    token: TrustToken,
}

impl AgentContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Settings snapshot read when the request began.
    pub fn settings(&self) -> &TrustSettings {
        &self.settings
    }

    pub fn token(&self) -> &TrustToken {
        &self.token
    }

    pub fn is_trusted(&self) -> bool {
        is_trusted(&self.principal, &self.token)
    }
}

/// Trust operations over one evaluator and one settings store.
pub struct AgentTrust<S, C> {
    evaluator: TrustEvaluator<C>,
    store: S,
}

impl<S: TrustSettingsStore, C: SealedChannel> AgentTrust<S, C> {
    /// # Errors
    ///
    /// `TrustError::Configuration` if `config` does not validate.
    pub fn new(config: TrustConfig, channel: C, store: S) -> Result<Self> {
        Ok(Self {
            evaluator: TrustEvaluator::new(config, channel)?,
            store,
        })
    }

    pub fn evaluator(&self) -> &TrustEvaluator<C> {
        &self.evaluator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a user's trust settings eagerly, e.g. on account creation.
    pub fn register_user(&self, user: &UserId) -> Result<TrustSettings> {
        self.store.ensure(user)
    }

    /// Establish the agent's trust state for an incoming request.
    ///
    /// `raw` is the inbound sealed value for this user's channel, if the
    /// agent sent one. Decoding problems yield an untrusted agent; only
    /// settings store failures are returned.
    pub fn begin(
        &self,
        principal: Principal,
        raw: Option<&str>,
        session: &dyn SessionStore,
        now: DateTime<Utc>,
    ) -> Result<AgentContext> {
        let Some(user) = principal.user_id() else {
            return Ok(AgentContext {
                token: TrustToken::untrusted(principal.clone()),
                principal,
                settings: TrustSettings::default(),
            });
        };

        let settings = self.store.ensure(user)?;
        let ambient = session.get(SESSION_TOKEN_KEY);
        let token = self
            .evaluator
            .load(raw, &principal, &settings, ambient.as_deref(), now);

        Ok(AgentContext {
            principal,
            settings,
            token,
        })
    }

    /// Seal the agent's current token for the response.
    ///
    /// `None` for anonymous requests.
    pub fn finish(&self, ctx: &AgentContext, now: DateTime<Utc>) -> Result<Option<SealedToken>> {
        self.evaluator.store(&ctx.token, &ctx.settings, now)
    }

    /// Mark the agent as trusted. Does nothing for anonymous users.
    pub fn trust(
        &self,
        ctx: &mut AgentContext,
        trust_days: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if ctx.principal.is_authenticated() {
            ctx.token = TrustToken::trusted(ctx.principal.clone(), &ctx.settings, trust_days, now)?;
            debug!("Trusted agent for {}", ctx.principal);
        }
        Ok(())
    }

    /// Trust the agent until the current session ends, replacing any
    /// existing trust. Does nothing for anonymous users.
    pub fn trust_for_session(
        &self,
        ctx: &mut AgentContext,
        session: &mut dyn SessionStore,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !ctx.principal.is_authenticated() {
            return Ok(());
        }

        let token = random::session_token();
        ctx.token =
            TrustToken::session_trusted(ctx.principal.clone(), &ctx.settings, token.clone(), now)?;
        session.insert(SESSION_TOKEN_KEY, token);
        debug!("Trusted agent for {} for this session", ctx.principal);
        Ok(())
    }

    /// Revoke trust in the requesting agent.
    pub fn revoke(&self, ctx: &mut AgentContext) {
        ctx.token = TrustToken::untrusted(ctx.principal.clone());
        debug!("Revoked agent for {}", ctx.principal);
    }

    /// Revoke every other agent of the user while keeping this one.
    /// Does nothing for anonymous users.
    pub fn revoke_others(&self, ctx: &mut AgentContext) -> Result<()> {
        let Some(user) = ctx.principal.user_id() else {
            return Ok(());
        };

        let serial = self.store.increment_serial(user)?;
        ctx.settings = ctx.settings.clone().with_serial(serial);
        ctx.token = ctx.token.with_serial(serial);
        debug!("Revoked other agents for {user}: serial={serial}");
        Ok(())
    }

    /// Whether the request's agent is trusted by its principal.
    pub fn is_trusted(&self, ctx: &AgentContext) -> bool {
        ctx.is_trusted()
    }

    /// Let the request through to `next`, or redirect to the configured
    /// login URL.
    pub fn require_trusted(
        &self,
        ctx: &AgentContext,
        next: &str,
    ) -> std::result::Result<(), LoginRedirect> {
        TrustGuard::new(self.evaluator.config()).check(&ctx.principal, &ctx.token, next)
    }
}
