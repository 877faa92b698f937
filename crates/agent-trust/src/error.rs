//! Error types for agent-trust.
//!
//! Channel and decode failures are recoverable: the evaluator turns them
//! into an untrusted token. Configuration and invalid-operation errors are
//! programming or deployment mistakes and always reach the caller.
//! Secret key material is never included in error messages.

/// Error types covering every trust operation.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("Sealed token signature is invalid")]
    SignatureInvalid,

    #[error("Sealed token exceeded its transport max-age")]
    TransportExpired,

    #[error("Malformed sealed token: {0}")]
    MalformedEnvelope(String),

    #[error("Trust record could not be decoded: {0}")]
    Decode(String),

    #[error("Trust record belongs to {found:?}, not {expected}")]
    CrossIdentity {
        expected: String,
        found: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrustError {
    /// Whether this error must be treated exactly like "agent never trusted".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SignatureInvalid
                | Self::TransportExpired
                | Self::MalformedEnvelope(_)
                | Self::Decode(_)
                | Self::CrossIdentity { .. }
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TrustError>;
