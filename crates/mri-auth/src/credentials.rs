//! Durable key/value storage for the credential pair and user snapshot
//!
//! Holds string values under the fixed keys in `constants` (`auth_token`,
//! `refresh_token`, `user_info`) and mirrors them to a JSON file. All writes
//! use atomic temp-file + rename. A tokio Mutex serializes writers, so the
//! last write wins and every read sees the most recently stored value.
//!
//! This store is the only component that mutates the session file. The API
//! client and services call its methods rather than writing keys directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{ALL_STORAGE_KEYS, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY};
use crate::error::{Error, Result};

/// File-backed session store.
///
/// Reads lock briefly and clone the value out, so a request reading its
/// access token never observes a half-applied refresh.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    /// Load the store from the given file path.
    ///
    /// A missing file is a cold start: the store begins empty and the file is
    /// created so later loads take the normal path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let values: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), keys = values.len(), "loaded session");
            values
        } else {
            info!(path = %path.display(), "session file not found, starting logged out");
            let values = HashMap::new();
            write_atomic(&path, &values).await?;
            values
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value for a key. Empty strings count as absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// Current access token, if one is stored.
    pub async fn access_token(&self) -> Option<String> {
        self.get(AUTH_TOKEN_KEY).await
    }

    /// Current refresh token, if one is stored.
    pub async fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    /// Whether an access token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some()
    }

    /// Store a new access token and, when the server rotated it, a new
    /// refresh token. `None` keeps the existing refresh token.
    pub async fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(AUTH_TOKEN_KEY.to_string(), access.to_string());
        if let Some(refresh) = refresh.filter(|r| !r.is_empty()) {
            state.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
        }
        debug!(rotated = refresh.is_some(), "stored tokens");
        write_atomic(&self.path, &state).await
    }

    /// Replace the whole session after a login.
    ///
    /// Unlike `set_tokens`, a missing refresh token removes the stored one,
    /// and the user snapshot of the previous session is dropped.
    pub async fn start_session(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(AUTH_TOKEN_KEY.to_string(), access.to_string());
        match refresh.filter(|r| !r.is_empty()) {
            Some(refresh) => {
                state.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
            }
            None => {
                state.remove(REFRESH_TOKEN_KEY);
            }
        }
        state.remove(USER_INFO_KEY);
        debug!(has_refresh = refresh.is_some(), "started session");
        write_atomic(&self.path, &state).await
    }

    /// Last-known user snapshot. A corrupt snapshot is treated as absent.
    pub async fn user_info(&self) -> Option<serde_json::Value> {
        let raw = self.get(USER_INFO_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "ignoring unparseable user snapshot");
                None
            }
        }
    }

    /// Replace the user snapshot.
    pub async fn set_user_info(&self, user: &serde_json::Value) -> Result<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| Error::CredentialParse(format!("serializing user snapshot: {e}")))?;
        let mut state = self.state.lock().await;
        state.insert(USER_INFO_KEY.to_string(), raw);
        debug!("stored user snapshot");
        write_atomic(&self.path, &state).await
    }

    /// Remove the credential pair, keeping the user snapshot.
    ///
    /// Used when a refresh fails: the session is gone but the snapshot stays
    /// available as an offline fallback.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.remove_keys(&[AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY]).await
    }

    /// Remove every stored key. Safe to call when nothing is stored.
    pub async fn clear(&self) -> Result<()> {
        self.remove_keys(ALL_STORAGE_KEYS).await
    }

    async fn remove_keys(&self, keys: &[&str]) -> Result<()> {
        let mut state = self.state.lock().await;
        let removed = keys
            .iter()
            .filter(|key| state.remove(**key).is_some())
            .count();
        debug!(removed, "cleared session keys");
        write_atomic(&self.path, &state).await
    }
}

/// Write the session map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Permissions are 0600 on unix since the file holds tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
