//! Sealed transport channel: the only cryptographic trust boundary.
//!
//! A channel turns a byte payload into a tamper-evident, expiring string
//! and back. The evaluator only depends on the [`SealedChannel`] trait;
//! [`HmacChannel`] is the bundled HMAC-SHA256 implementation.
//!
//! Channels are namespaced per user: the channel name is part of the MAC
//! key derivation, so a blob issued under one user's name never unseals
//! under another's.

pub mod hmac_channel;

use chrono::{DateTime, TimeDelta, Utc};

use crate::crypto::derivation::identity_suffix;
use crate::error::Result;
use crate::identity::UserId;

pub use hmac_channel::{ChannelSecret, HmacChannel};

/// Seal and unseal opaque payloads for transport.
pub trait SealedChannel: Send + Sync {
    /// Wrap `payload` into a tamper-evident string that stops unsealing
    /// once it is older than `max_age`.
    fn seal(
        &self,
        channel: &str,
        payload: &[u8],
        max_age: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<String>;

    /// Recover the payload.
    ///
    /// # Errors
    ///
    /// `TrustError::MalformedEnvelope` for structurally invalid input,
    /// `TrustError::SignatureInvalid` on tampering or a foreign channel,
    /// `TrustError::TransportExpired` when the blob is older than `max_age`
    /// or past the expiry recorded at seal time.
    fn unseal(
        &self,
        channel: &str,
        sealed: &str,
        max_age: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>>;
}

/// Per-user channel name: `{base}-{16 hex chars of SHA-256(identity)}`.
pub fn channel_name(base: &str, user: &UserId) -> String {
    format!("{base}-{}", identity_suffix(user.as_str()))
}
