//! Storage collaborators: per-user trust settings and session values.
//!
//! The trust core reads settings once per request and only writes them
//! for revoke-others. Stores must make [`TrustSettingsStore::increment_serial`]
//! atomic; the core relies on that and does no locking of its own.
//!
//! # Directory layout
//!
//! [`FileSettingsStore`] keeps one JSON file per user:
//!
//! ```text
//! {base_dir}/
//! ├── {sha256(identity)}.json
//! └── {sha256(identity)}.lock
//! ```
//!
//! # Modules
//!
//! - [`memory`]: in-process settings store.
//! - [`settings_file`]: JSON-file settings store.
//! - [`session`]: in-memory session for session-scoped trust.

pub mod memory;
pub mod session;
pub mod settings_file;

use crate::error::Result;
use crate::identity::UserId;
use crate::trust::TrustSettings;

pub use memory::MemorySettingsStore;
pub use session::MemorySession;
pub use settings_file::FileSettingsStore;

/// Session key under which the correlation token for session-scoped trust
/// is kept.
pub const SESSION_TOKEN_KEY: &str = "agent-trust-token";

/// Per-user [`TrustSettings`] persistence.
pub trait TrustSettingsStore: Send + Sync {
    /// Load a user's settings, if any exist.
    fn load(&self, user: &UserId) -> Result<Option<TrustSettings>>;

    /// Load a user's settings, creating the defaults if necessary.
    fn ensure(&self, user: &UserId) -> Result<TrustSettings>;

    /// Replace a user's limits.
    ///
    /// The stored serial never moves backwards: the saved serial is the
    /// larger of the stored one and `settings.serial`.
    fn save(&self, user: &UserId, settings: &TrustSettings) -> Result<()>;

    /// Atomically apply `edit` to the user's settings and return the result.
    ///
    /// Creates default settings first if the user has none. The same serial
    /// rule as [`save`](Self::save) applies, so an edit racing a
    /// revoke-others cannot undo it.
    fn update(
        &self,
        user: &UserId,
        edit: &mut dyn FnMut(&mut TrustSettings),
    ) -> Result<TrustSettings>;

    /// Atomically add one to the user's serial and return the new value.
    ///
    /// Creates default settings first if the user has none.
    fn increment_serial(&self, user: &UserId) -> Result<i64>;

    /// Delete a user's settings on account deletion. Returns whether any
    /// existed.
    fn remove(&self, user: &UserId) -> Result<bool>;
}

/// The slice of server-side session state the trust core touches.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;

    fn insert(&mut self, key: &str, value: String);

    fn remove(&mut self, key: &str) -> Option<String>;
}
