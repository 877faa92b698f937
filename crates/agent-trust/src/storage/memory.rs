//! In-process settings store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, TrustError};
use crate::identity::UserId;
use crate::trust::TrustSettings;

use super::TrustSettingsStore;

/// Mutex-guarded map of user settings. Suitable for tests and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    entries: Mutex<HashMap<UserId, TrustSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with settings.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.entries()?.is_empty())
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<UserId, TrustSettings>>> {
        self.entries
            .lock()
            .map_err(|_| TrustError::Storage("settings lock poisoned".into()))
    }
}

impl TrustSettingsStore for MemorySettingsStore {
    fn load(&self, user: &UserId) -> Result<Option<TrustSettings>> {
        Ok(self.entries()?.get(user).cloned())
    }

    fn ensure(&self, user: &UserId) -> Result<TrustSettings> {
        Ok(self.entries()?.entry(user.clone()).or_default().clone())
    }

    fn save(&self, user: &UserId, settings: &TrustSettings) -> Result<()> {
        settings.validate()?;
        let mut entries = self.entries()?;
        let serial = entries
            .get(user)
            .map_or(settings.serial, |stored| stored.serial.max(settings.serial));
        entries.insert(user.clone(), settings.clone().with_serial(serial));
        Ok(())
    }

    fn update(
        &self,
        user: &UserId,
        edit: &mut dyn FnMut(&mut TrustSettings),
    ) -> Result<TrustSettings> {
        let mut entries = self.entries()?;
        let current = entries.entry(user.clone()).or_default();
        let mut next = current.clone();
        edit(&mut next);
        next.validate()?;
        next.serial = next.serial.max(current.serial);
        *current = next.clone();
        Ok(next)
    }

    fn increment_serial(&self, user: &UserId) -> Result<i64> {
        let mut entries = self.entries()?;
        let settings = entries.entry(user.clone()).or_default();
        settings.serial += 1;
        Ok(settings.serial)
    }

    fn remove(&self, user: &UserId) -> Result<bool> {
        Ok(self.entries()?.remove(user).is_some())
    }
}
