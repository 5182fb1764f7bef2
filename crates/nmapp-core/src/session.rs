//! Session persistence.
//!
//! The session lives in `<base>/session.json` under three fixed keys
//! (`accessToken`, `refreshToken`, `user`) with restricted permissions
//! (0600). Tokens are never logged or displayed in full.
//!
//! Loading fails closed: a missing, unreadable or malformed file means
//! "logged out", never an error.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::api::UserProfile;
use crate::config::paths;
use crate::error::{ClientError, ClientResult};

/// Authenticated identity and tokens for the current login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Durable storage for the session.
pub trait SessionStore: Send + Sync {
    /// Returns the stored session, or `None` when logged out or unreadable.
    fn load(&self) -> Option<Session>;

    /// Persists all session fields together.
    ///
    /// # Errors
    /// Returns a storage error if the session cannot be written.
    fn save(&self, session: &Session) -> ClientResult<()>;

    /// Removes every stored session field. Returns whether anything was stored.
    ///
    /// # Errors
    /// Returns a storage error if the stored session cannot be removed.
    fn clear(&self) -> ClientResult<bool>;
}

/// File-backed store used by the CLI.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default `<home>/session.json`.
    pub fn at_default_path() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_restricted(path: &Path, contents: &str) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            file.write_all(contents.as_bytes())?;
        }

        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "session unreadable; treating as logged out");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) if !session.access_token.trim().is_empty() => Some(session),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "session has no access token; treating as logged out");
                None
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "session malformed; treating as logged out");
                None
            }
        }
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::storage(format!("Failed to create directory {}", parent.display()))
                    .with_details(err.to_string())
            })?;
        }

        let contents = serde_json::to_string_pretty(session).map_err(|err| {
            ClientError::storage("Failed to serialize session").with_details(err.to_string())
        })?;

        // Write next to the target, then rename, so a reader never sees a
        // session with only some of its fields.
        let tmp_path = self.path.with_extension("json.tmp");
        Self::write_restricted(&tmp_path, &contents)
            .and_then(|()| fs::rename(&tmp_path, &self.path))
            .map_err(|err| {
                ClientError::storage(format!("Failed to write {}", self.path.display()))
                    .with_details(err.to_string())
            })?;

        tracing::info!(user_id = session.user.id, "session saved");
        Ok(())
    }

    fn clear(&self) -> ClientResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("session cleared");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ClientError::storage(format!(
                "Failed to remove {}",
                self.path.display()
            ))
            .with_details(err.to_string())),
        }
    }
}

/// In-memory store for embedders and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        // A poisoned slot still holds a whole session or none.
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.lock().clone()
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        *self.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<bool> {
        Ok(self.lock().take().is_some())
    }
}

/// Masks a token for display (shows first 12 chars).
pub fn mask_token(token: &str) -> String {
    if token.len() > 12 && token.is_char_boundary(12) {
        format!("{}...", &token[..12])
    } else {
        "***".to_string()
    }
}
