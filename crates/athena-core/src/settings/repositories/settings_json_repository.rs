use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::{SettingsError, SettingsResult};
use super::settings_repository::{BoxFuture, SettingsRepository};
use crate::config::{SETTINGS_FILE_NAME, default_workspace};
use crate::persistence::write_atomically;
use crate::settings::models::Settings;

/// Why a stored settings file could not be used as-is
enum LoadOutcome {
    Loaded(Settings),
    Missing,
    Empty,
    Unreadable(String),
}

/// JSON file-based settings storage at `<working_directory>/settings.json`
pub struct SettingsJsonRepository {
    file_path: Mutex<PathBuf>,
}

impl SettingsJsonRepository {
    /// Repository anchored in the default workspace (`~/Athena_Workspace`)
    pub fn new() -> Self {
        Self::in_directory(&default_workspace())
    }

    pub fn in_directory(directory: &Path) -> Self {
        Self::with_path(directory.join(SETTINGS_FILE_NAME))
    }

    /// Create repository with custom path (for testing)
    pub fn with_path(file_path: PathBuf) -> Self {
        Self {
            file_path: Mutex::new(file_path),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.file_path.lock().clone()
    }
}

impl Default for SettingsJsonRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn read_settings(path: &Path) -> LoadOutcome {
    if !path.exists() {
        return LoadOutcome::Missing;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => return LoadOutcome::Unreadable(e.to_string()),
    };

    if contents.trim().is_empty() {
        return LoadOutcome::Empty;
    }

    match serde_json::from_str::<Settings>(&contents) {
        Ok(settings) => LoadOutcome::Loaded(settings),
        Err(e) => LoadOutcome::Unreadable(e.to_string()),
    }
}

fn write_settings(path: &Path, settings: &Settings) -> SettingsResult<()> {
    let json = serde_json::to_string_pretty(settings)?;
    write_atomically(path, json.as_bytes())?;
    Ok(())
}

impl SettingsRepository for SettingsJsonRepository {
    fn load(&self) -> BoxFuture<'static, Settings> {
        let path = self.file_path();

        Box::pin(async move {
            let outcome = tokio::task::spawn_blocking({
                let path = path.clone();
                move || read_settings(&path)
            })
            .await
            .unwrap_or_else(|e| LoadOutcome::Unreadable(e.to_string()));

            match outcome {
                LoadOutcome::Loaded(settings) => {
                    debug!(path = %path.display(), "Loaded settings");
                    return settings;
                }
                LoadOutcome::Missing => {
                    info!(path = %path.display(), "No settings file, writing defaults");
                }
                LoadOutcome::Empty => {
                    warn!(path = %path.display(), "Settings file is empty, using default settings");
                }
                LoadOutcome::Unreadable(reason) => {
                    warn!(
                        path = %path.display(),
                        error = %reason,
                        "Failed to read settings, using default settings"
                    );
                }
            }

            let defaults = Settings::default();
            let to_save = defaults.clone();
            let saved = tokio::task::spawn_blocking(move || write_settings(&path, &to_save))
                .await
                .map_err(SettingsError::from)
                .and_then(|result| result);
            if let Err(e) = saved {
                warn!(error = ?e, "Failed to persist default settings");
            }

            defaults
        })
    }

    fn save(&self, settings: Settings) -> BoxFuture<'static, SettingsResult<()>> {
        let path = self.file_path();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || write_settings(&path, &settings)).await??;
            Ok(())
        })
    }

    fn set_working_directory(&self, directory: &Path) {
        let new_path = directory.join(SETTINGS_FILE_NAME);
        info!(path = %new_path.display(), "Settings location updated");
        *self.file_path.lock() = new_path;
    }
}
