//! Key derivation using HKDF-SHA256.
//!
//! Each transport channel gets its own MAC key derived from the server
//! secret, so a token sealed for one user's channel never verifies under
//! another user's channel name.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use crate::error::{Result, TrustError};

const DERIVATION_SALT: &[u8] = b"agent-trust/v1";

/// Derive a 32-byte MAC key from the server secret and a context string.
///
/// Uses HKDF-SHA256 (RFC 5869) with the secret as IKM and the context as
/// info.
pub fn derive_key(secret: &[u8], context: &str) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), secret);
    let mut output = [0u8; 32];
    hk.expand(context.as_bytes(), &mut output)
        .map_err(|e| TrustError::Configuration(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Build a derivation context string for a transport channel.
pub fn channel_context(channel_name: &str) -> String {
    format!("agent-trust/channel/{channel_name}")
}

/// Sixteen hex characters derived from a stable identity string.
///
/// Used to give every user a distinct channel name without exposing the
/// identity itself in transport metadata.
pub fn identity_suffix(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    hex::encode(&digest[8..16])
}
