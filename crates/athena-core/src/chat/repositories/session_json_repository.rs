use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::error::{SessionError, SessionResult};
use super::session_repository::{BoxFuture, SessionRepository, validate_session_name};
use crate::chat::models::Message;
use crate::config::{CHATS_DIR_NAME, default_workspace};
use crate::persistence::write_atomically;

const SESSION_EXTENSION: &str = "json";

/// JSON file-based repository for chat sessions.
/// Stores each session as `<name>.json` in `<working_directory>/chats/`.
pub struct SessionJsonRepository {
    chats_dir: Mutex<PathBuf>,
}

impl SessionJsonRepository {
    pub fn new() -> Self {
        Self::in_working_directory(&default_workspace())
    }

    pub fn in_working_directory(directory: &Path) -> Self {
        Self::with_chats_dir(directory.join(CHATS_DIR_NAME))
    }

    /// Create repository with a custom sessions folder (for testing)
    pub fn with_chats_dir(chats_dir: PathBuf) -> Self {
        Self {
            chats_dir: Mutex::new(chats_dir),
        }
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.chats_dir.lock().clone()
    }

    fn session_path(&self, name: &str) -> SessionResult<PathBuf> {
        validate_session_name(name)?;
        Ok(self
            .chats_dir()
            .join(format!("{}.{}", name, SESSION_EXTENSION)))
    }
}

impl Default for SessionJsonRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRepository for SessionJsonRepository {
    fn save(&self, name: &str, messages: Vec<Message>) -> BoxFuture<'static, SessionResult<()>> {
        let path = self.session_path(name);
        let name = name.to_string();

        Box::pin(async move {
            let path = path?;
            let json = serde_json::to_string_pretty(&messages)?;

            tokio::task::spawn_blocking(move || write_atomically(&path, json.as_bytes())).await??;

            info!(session = %name, messages = messages.len(), "Session saved");
            Ok(())
        })
    }

    fn load(&self, name: &str) -> BoxFuture<'static, SessionResult<Vec<Message>>> {
        let path = self.session_path(name);
        let name = name.to_string();

        Box::pin(async move {
            let path = path?;

            let contents = tokio::task::spawn_blocking({
                let name = name.clone();
                move || {
                    if !path.exists() {
                        return Err(SessionError::NotFound { name });
                    }
                    Ok(std::fs::read_to_string(&path)?)
                }
            })
            .await??;

            let messages: Vec<Message> = serde_json::from_str(&contents)
                .map_err(|source| SessionError::Corrupt {
                    name: name.clone(),
                    source,
                })?;

            debug!(session = %name, messages = messages.len(), "Session loaded");
            Ok(messages)
        })
    }

    fn list(&self) -> BoxFuture<'static, SessionResult<Vec<String>>> {
        let chats_dir = self.chats_dir();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> SessionResult<Vec<String>> {
                std::fs::create_dir_all(&chats_dir)?;

                let mut names = Vec::new();
                for entry in std::fs::read_dir(&chats_dir)? {
                    let path = entry?.path();

                    if path.is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some(SESSION_EXTENSION)
                        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_string());
                    }
                }

                names.sort();
                Ok(names)
            })
            .await?
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'static, SessionResult<()>> {
        let path = self.session_path(name);
        let name = name.to_string();

        Box::pin(async move {
            let path = path?;

            tokio::task::spawn_blocking(move || {
                if !path.exists() {
                    return Err(SessionError::NotFound { name });
                }
                std::fs::remove_file(&path)?;
                info!(session = %name, "Session deleted");
                Ok(())
            })
            .await?
        })
    }

    fn rename(&self, old_name: &str, new_name: &str) -> BoxFuture<'static, SessionResult<()>> {
        let old_path = self.session_path(old_name);
        let new_path = self.session_path(new_name);
        let old_name = old_name.to_string();
        let new_name = new_name.to_string();

        Box::pin(async move {
            let old_path = old_path?;
            let new_path = new_path?;

            tokio::task::spawn_blocking(move || {
                if !old_path.exists() {
                    return Err(SessionError::NotFound { name: old_name });
                }
                std::fs::rename(&old_path, &new_path)?;
                info!(from = %old_name, to = %new_name, "Session renamed");
                Ok(())
            })
            .await?
        })
    }

    fn set_working_directory(&self, directory: &Path) {
        let chats_dir = directory.join(CHATS_DIR_NAME);
        info!(path = %chats_dir.display(), "Sessions folder updated");
        *self.chats_dir.lock() = chats_dir;
    }
}
