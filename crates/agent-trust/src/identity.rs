//! Principals: who a trust token claims to belong to.
//!
//! Trust is always keyed on the user's stable identity string (the login
//! name or account key), never on a mutable display name.

use serde::{Deserialize, Serialize};

/// Stable identity string of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The requesting principal as established by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    Anonymous,
    User(UserId),
}

impl Principal {
    /// Shorthand for an authenticated principal.
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(UserId::new(id))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// The stable identity, if authenticated.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous => None,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "<anonymous>"),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}
