//! Agent trust: signed, expiring, revocable "remember this device" claims.
//!
//! The trust module provides:
//! - Immutable trust tokens and their portable wire record
//! - Minimum-of-present TTL and inactivity policy resolution
//! - Expiration, serial revocation and session binding checks
//! - The evaluator that unseals inbound tokens and seals outbound ones
//! - A guard for resources that require a trusted agent

pub mod evaluator;
pub mod guard;
pub mod policy;
pub mod record;
pub mod settings;
pub mod token;
pub mod verify;

pub use evaluator::{SealedToken, TrustEvaluator};
pub use guard::{is_trusted, LoginRedirect, TrustGuard};
pub use policy::{inactivity_max_age, resolve_inactivity, resolve_ttl};
pub use record::TrustRecord;
pub use settings::TrustSettings;
pub use token::{TrustToken, UNTRUSTED_SERIAL};
pub use verify::{verify_token, TokenVerification};
