//! In-memory session.

use std::collections::HashMap;

use super::SessionStore;

/// A map-backed session, standing in for the web framework's own.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: HashMap<String, String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every value, as happens when a session ends (logout).
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}
