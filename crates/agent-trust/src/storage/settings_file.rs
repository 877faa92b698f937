//! Trust settings persistence on the filesystem.
//!
//! Stores one `TrustSettings` record per user as a JSON file, next to a
//! lock file that serializes writers across processes:
//!
//! ```text
//! {base_dir}/
//! ├── {sha256(identity)}.json
//! └── {sha256(identity)}.lock
//! ```
//!
//! File format:
//! ```json
//! { "version": 1, "username": "alice", "settings": { ... TrustSettings ... } }
//! ```
//!
//! Writes go to a uniquely named temporary file that is renamed into place,
//! so readers never observe a half-written record.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, TrustError};
use crate::identity::UserId;
use crate::trust::TrustSettings;

use super::TrustSettingsStore;

// ── File format constants ─────────────────────────────────────────────────────

const SETTINGS_FILE_VERSION: u32 = 1;

// ── On-disk structures ────────────────────────────────────────────────────────

/// Wrapper written to disk for each user's settings.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    /// Format version number.
    version: u32,
    /// Identity the settings belong to.
    username: String,
    /// The stored settings.
    settings: TrustSettings,
}

/// Exclusive advisory lock on a user's lock file, released on drop.
struct UserLock {
    file: File,
}

impl Drop for UserLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

// ── FileSettingsStore ─────────────────────────────────────────────────────────

/// Filesystem-backed [`TrustSettingsStore`].
///
/// Read-modify-write operations hold an exclusive lock on the user's
/// `.lock` file, so `increment_serial` is atomic across every store and
/// process sharing `base_dir`.
pub struct FileSettingsStore {
    base_dir: PathBuf,
}

impl FileSettingsStore {
    /// Create a new `FileSettingsStore` rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns `TrustError::Io` if the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// List every user with stored settings.
    ///
    /// The returned list is not sorted in any particular order. Unreadable
    /// files are skipped with a warning.
    pub fn list_users(&self) -> Result<Vec<UserId>> {
        let mut users = Vec::new();

        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_file(&path) {
                Ok(Some(file)) => users.push(UserId(file.username)),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable settings file {}: {e}", path.display()),
            }
        }

        Ok(users)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn file_stem(user: &UserId) -> String {
        hex::encode(Sha256::digest(user.as_str().as_bytes()))
    }

    /// Build the filesystem path for a user: `{base_dir}/{sha256}.json`.
    fn settings_path(&self, user: &UserId) -> PathBuf {
        self.base_dir.join(format!("{}.json", Self::file_stem(user)))
    }

    /// Block until this process holds the user's write lock.
    fn lock(&self, user: &UserId) -> Result<UserLock> {
        let path = self.base_dir.join(format!("{}.lock", Self::file_stem(user)));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.lock_exclusive().map_err(|e| {
            TrustError::Storage(format!("cannot lock {}: {e}", path.display()))
        })?;
        Ok(UserLock { file })
    }

    fn read(&self, user: &UserId) -> Result<Option<TrustSettings>> {
        let path = self.settings_path(user);
        let Some(file) = read_file(&path)? else {
            return Ok(None);
        };

        if file.username != user.as_str() {
            return Err(TrustError::Storage(format!(
                "settings file {} belongs to {:?}",
                path.display(),
                file.username
            )));
        }
        Ok(Some(file.settings))
    }

    fn write(&self, user: &UserId, settings: &TrustSettings) -> Result<()> {
        let file = SettingsFile {
            version: SETTINGS_FILE_VERSION,
            username: user.0.clone(),
            settings: settings.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| TrustError::Serialization(e.to_string()))?;

        let path = self.settings_path(user);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| {
            TrustError::Storage(format!("cannot persist {}: {}", path.display(), e.error))
        })?;

        Ok(())
    }
}

impl TrustSettingsStore for FileSettingsStore {
    fn load(&self, user: &UserId) -> Result<Option<TrustSettings>> {
        self.read(user)
    }

    fn ensure(&self, user: &UserId) -> Result<TrustSettings> {
        let _lock = self.lock(user)?;
        if let Some(settings) = self.read(user)? {
            return Ok(settings);
        }
        let settings = TrustSettings::default();
        self.write(user, &settings)?;
        Ok(settings)
    }

    fn save(&self, user: &UserId, settings: &TrustSettings) -> Result<()> {
        settings.validate()?;
        let _lock = self.lock(user)?;
        let serial = match self.read(user)? {
            Some(stored) => stored.serial.max(settings.serial),
            None => settings.serial,
        };
        self.write(user, &settings.clone().with_serial(serial))
    }

    fn update(
        &self,
        user: &UserId,
        edit: &mut dyn FnMut(&mut TrustSettings),
    ) -> Result<TrustSettings> {
        let _lock = self.lock(user)?;
        let current = self.read(user)?.unwrap_or_default();
        let mut next = current.clone();
        edit(&mut next);
        next.validate()?;
        next.serial = next.serial.max(current.serial);
        self.write(user, &next)?;
        Ok(next)
    }

    fn increment_serial(&self, user: &UserId) -> Result<i64> {
        let _lock = self.lock(user)?;
        let mut settings = self.read(user)?.unwrap_or_default();
        settings.serial += 1;
        self.write(user, &settings)?;
        Ok(settings.serial)
    }

    fn remove(&self, user: &UserId) -> Result<bool> {
        let _lock = self.lock(user)?;
        match std::fs::remove_file(self.settings_path(user)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read and deserialize a settings file. `None` if it does not exist.
fn read_file(path: &Path) -> Result<Option<SettingsFile>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: SettingsFile = serde_json::from_slice(&bytes).map_err(|e| {
        TrustError::Storage(format!(
            "failed to parse settings file {}: {e}",
            path.display()
        ))
    })?;
    if file.version != SETTINGS_FILE_VERSION {
        return Err(TrustError::Storage(format!(
            "unsupported settings file version {} in {}",
            file.version,
            path.display()
        )));
    }
    Ok(Some(file))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
