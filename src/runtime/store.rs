//! File-backed redirect store
//!
//! Persists the redirect-after-login path as a small JSON document so it
//! survives a process restart, the headless analogue of a full document load.

use super::RedirectStore;
use crate::types::{NavError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRedirect {
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_after_login: Option<String>,
}

pub struct FileRedirectStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileRedirectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoredRedirect {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return StoredRedirect::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring unreadable redirect store");
            StoredRedirect::default()
        })
    }

    fn write(&self, stored: &StoredRedirect) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| NavError::Storage(e.to_string()))?;
            }
        }
        let json =
            serde_json::to_string_pretty(stored).map_err(|e| NavError::Storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| NavError::Storage(e.to_string()))
    }
}

impl RedirectStore for FileRedirectStore {
    fn save(&self, path: &str) -> Result<()> {
        let _guard = self.lock.lock();
        self.write(&StoredRedirect {
            redirect_after_login: Some(path.to_string()),
        })
    }

    fn peek(&self) -> Option<String> {
        let _guard = self.lock.lock();
        self.read().redirect_after_login
    }

    fn take(&self) -> Option<String> {
        let _guard = self.lock.lock();
        let saved = self.read().redirect_after_login?;
        if let Err(e) = self.write(&StoredRedirect::default()) {
            warn!(error = %e, "Failed to clear redirect store");
        }
        Some(saved)
    }
}
