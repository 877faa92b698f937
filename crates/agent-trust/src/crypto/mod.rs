//! Cryptographic helpers for agent-trust.
//!
//! This module provides:
//! - HKDF-SHA256 derivation of per-channel MAC keys
//! - SHA-256 identity suffixes for channel names
//! - Random session correlation tokens and channel secrets

pub mod derivation;
pub mod random;
