//! Random value generation.
//!
//! Uses the operating system's random source via `rand`.

use rand::RngCore;

/// Fill a buffer with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// Generate a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    fill_random(&mut buf);
    buf
}

/// Generate a session correlation token.
///
/// The token is only ever compared for equality against the copy kept in
/// server-side session storage, so it needs to be unique rather than
/// unguessable. 32 random bits rendered as decimal.
pub fn session_token() -> String {
    rand::thread_rng().next_u32().to_string()
}

/// Generate a fresh channel secret, hex encoded.
pub fn channel_secret_hex() -> String {
    hex::encode(random_bytes::<32>())
}
