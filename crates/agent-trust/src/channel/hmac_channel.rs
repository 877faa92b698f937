//! HMAC-SHA256 sealed channel.
//!
//! Envelope format (all parts ASCII, `.`-separated):
//!
//! ```text
//! base64url(payload) . issued_at . expires_at . hex(HMAC-SHA256(key, first three parts))
//! ```
//!
//! `issued_at` and `expires_at` are decimal Unix seconds. The MAC key is
//! derived per channel name with HKDF, so the channel name is implicitly
//! authenticated as well.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{derivation, random};
use crate::error::{Result, TrustError};
use crate::time;

use super::SealedChannel;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Server-side secret keying every channel. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChannelSecret(Vec<u8>);

impl ChannelSecret {
    /// Wrap raw secret bytes.
    ///
    /// # Errors
    ///
    /// `TrustError::Configuration` if shorter than [`MIN_SECRET_LEN`].
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(TrustError::Configuration(format!(
                "channel secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode a hex-encoded secret.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| TrustError::Configuration(format!("channel secret is not hex: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Generate a fresh random 32-byte secret.
    pub fn generate() -> Self {
        Self(random::random_bytes::<32>().to_vec())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for ChannelSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelSecret(<{} bytes>)", self.0.len())
    }
}

/// [`SealedChannel`] backed by HMAC-SHA256 over a timestamped envelope.
#[derive(Debug, Clone)]
pub struct HmacChannel {
    secret: ChannelSecret,
}

impl HmacChannel {
    pub fn new(secret: ChannelSecret) -> Self {
        Self { secret }
    }

    fn mac(&self, channel: &str) -> Result<HmacSha256> {
        let mut key = derivation::derive_key(
            self.secret.as_bytes(),
            &derivation::channel_context(channel),
        )?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| TrustError::Configuration(format!("invalid HMAC key: {e}")));
        key.zeroize();
        mac
    }
}

impl SealedChannel for HmacChannel {
    fn seal(
        &self,
        channel: &str,
        payload: &[u8],
        max_age: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let issued_at = time::to_epoch_seconds(now);
        let expires_at = time::to_epoch_seconds(time::add_saturating(now, max_age));
        let body = format!(
            "{}.{issued_at}.{expires_at}",
            URL_SAFE_NO_PAD.encode(payload)
        );

        let mut mac = self.mac(channel)?;
        mac.update(body.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{body}.{tag}"))
    }

    fn unseal(
        &self,
        channel: &str,
        sealed: &str,
        max_age: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let (body, tag) = sealed
            .rsplit_once('.')
            .ok_or_else(|| TrustError::MalformedEnvelope("missing signature".into()))?;
        let tag = hex::decode(tag)
            .map_err(|e| TrustError::MalformedEnvelope(format!("signature is not hex: {e}")))?;

        // Constant-time comparison
        let mut mac = self.mac(channel)?;
        mac.update(body.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| TrustError::SignatureInvalid)?;

        let mut parts = body.split('.');
        let (Some(payload), Some(issued_at), Some(expires_at), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TrustError::MalformedEnvelope(
                "expected payload, issued and expiry fields".into(),
            ));
        };

        let issued_at = parse_seconds(issued_at)?;
        let expires_at = parse_seconds(expires_at)?;
        let now_secs = time::to_epoch_seconds(now);

        if now_secs > expires_at {
            return Err(TrustError::TransportExpired);
        }
        if now_secs.saturating_sub(issued_at) > max_age.num_seconds() {
            return Err(TrustError::TransportExpired);
        }

        URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TrustError::MalformedEnvelope(format!("payload is not base64: {e}")))
    }
}

fn parse_seconds(field: &str) -> Result<i64> {
    field
        .parse::<i64>()
        .map_err(|e| TrustError::MalformedEnvelope(format!("invalid timestamp {field:?}: {e}")))
}
