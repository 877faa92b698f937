//! AgentTrust: Stateless trust tokens for the agents (browsers, devices,
//! clients) a user signs in from.
//!
//! Provides "remember this device" trust claims that travel with the agent
//! inside a signed, expiring envelope, with bounded lifetimes, bulk
//! revocation by serial number, session-scoped trust, and a guard for
//! resources that require a trusted agent.

pub mod channel;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod service;
pub mod storage;
pub mod time;
pub mod trust;

// Re-export primary types
pub use config::{TransportOptions, TrustConfig};
pub use error::{Result, TrustError};
pub use identity::{Principal, UserId};
pub use service::{AgentContext, AgentTrust};

// Re-export channel types
pub use channel::{channel_name, ChannelSecret, HmacChannel, SealedChannel};

// Re-export storage types
pub use storage::{
    FileSettingsStore, MemorySession, MemorySettingsStore, SessionStore, TrustSettingsStore,
    SESSION_TOKEN_KEY,
};

// Re-export trust types
pub use trust::{
    is_trusted, verify_token, LoginRedirect, SealedToken, TokenVerification, TrustEvaluator,
    TrustGuard, TrustRecord, TrustSettings, TrustToken,
};
