//! Session persistence
//!
//! Sessions are cached per account id (the username, or `guest_<token>` for guest
//! links) so a restart can skip the login flow when the portal still accepts them.
//! The store never expires anything itself; validity is decided by a live probe.

use super::Session;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

pub trait SessionStore: Send + Sync {
    /// Overwrite the record for `account_id`
    fn save(&self, account_id: &str, session: &Session) -> Result<()>;

    /// `None` when nothing usable is stored, including a missing or corrupt store
    fn load(&self, account_id: &str) -> Option<Session>;

    /// Delete the record for `account_id`; absent records are fine
    fn remove(&self, account_id: &str) -> Result<()>;
}

/// JSON file holding one record per account
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, Session> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session store is corrupt, ignoring it"
                );
                BTreeMap::new()
            }
        }
    }

    fn write_all(&self, records: &BTreeMap<String, Session>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(records).context("Failed to serialize sessions")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write session file: {}", tmp_path.display()))?;
        restrict_permissions(&tmp_path);
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace session file: {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        debug!(path = %path.display(), error = %e, "Could not restrict session file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

impl SessionStore for FileSessionStore {
    fn save(&self, account_id: &str, session: &Session) -> Result<()> {
        let mut records = self.read_all();
        records.insert(account_id.to_string(), session.clone());
        self.write_all(&records)?;
        debug!(account_id, path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn load(&self, account_id: &str) -> Option<Session> {
        let session = self.read_all().remove(account_id);
        debug!(account_id, found = session.is_some(), "Session lookup");
        session
    }

    fn remove(&self, account_id: &str) -> Result<()> {
        let mut records = self.read_all();
        if records.remove(account_id).is_some() {
            self.write_all(&records)?;
            debug!(account_id, path = %self.path.display(), "Session removed");
        }
        Ok(())
    }
}

/// In-process store, used when nothing should touch the disk
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, account_id: &str, session: &Session) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id.to_string(), session.clone());
        Ok(())
    }

    fn load(&self, account_id: &str) -> Option<Session> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account_id)
            .cloned()
    }

    fn remove(&self, account_id: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account_id);
        Ok(())
    }
}
