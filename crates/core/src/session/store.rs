use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// On-disk representation of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    token: Option<String>,
}

/// Cloneable handle to the current auth token.
///
/// When backed by a file, every change is written through immediately so a
/// restart of the console keeps the session. Expiry is not tracked here; the
/// API client clears the token when the backend answers 401.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    path: Option<PathBuf>,
    token: Option<String>,
}

impl SessionStore {
    /// Open a store persisted at `path`, loading any token already saved there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = load_token(&path)?;
        if token.is_some() {
            info!(path = %path.display(), "Restored saved session");
        }
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                path: Some(path),
                token,
            })),
        })
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                path: None,
                token: None,
            })),
        }
    }

    /// Replace the current token and persist it.
    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.write();
        inner.token = Some(token.into());
        persist(&inner)
    }

    /// Current token, if logged in.
    pub fn get_token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    /// Forget the token and persist the logged-out state.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.token.take().is_some() {
            info!("Session cleared");
        }
        persist(&inner)
    }

    /// Whether a token is present.
    pub fn is_logged_in(&self) -> bool {
        self.inner.read().token.is_some()
    }
}

fn load_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session {}", path.display()))?;
    match serde_json::from_str::<SessionFile>(&contents) {
        Ok(file) => Ok(file.token.filter(|token| !token.trim().is_empty())),
        Err(err) => {
            warn!(path = %path.display(), "Ignoring unreadable session file: {err}");
            Ok(None)
        }
    }
}

fn persist(inner: &Inner) -> Result<()> {
    let Some(path) = inner.path.as_ref() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create session directory {}", parent.display()))?;
    }
    let file = SessionFile {
        token: inner.token.clone(),
    };
    let serialized = serde_json::to_string_pretty(&file).context("failed to serialize session")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write session {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn token_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/session.json");

        let store = SessionStore::open(&path)?;
        assert!(!store.is_logged_in());
        store.set_token("abc123")?;
        assert_eq!(store.get_token().as_deref(), Some("abc123"));

        let reopened = SessionStore::open(&path)?;
        assert!(reopened.is_logged_in());
        assert_eq!(reopened.get_token().as_deref(), Some("abc123"));

        reopened.clear()?;
        assert!(!reopened.is_logged_in());
        assert!(!SessionStore::open(&path)?.is_logged_in());
        Ok(())
    }

    #[test]
    fn clones_share_state() -> Result<()> {
        let store = SessionStore::in_memory();
        let other = store.clone();
        store.set_token("t")?;
        assert!(other.is_logged_in());
        other.clear()?;
        assert_eq!(store.get_token(), None);
        Ok(())
    }

    #[test]
    fn corrupt_file_starts_logged_out() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "not json")?;
        let store = SessionStore::open(&path)?;
        assert!(!store.is_logged_in());
        Ok(())
    }
}
