use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use super::error::SettingsResult;
use crate::settings::models::Settings;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SettingsRepository: Send + Sync + 'static {
    /// Load settings, falling back to (and persisting) defaults when the
    /// stored file is missing, empty or unreadable. Never fails.
    fn load(&self) -> BoxFuture<'static, Settings>;

    /// Save settings to storage
    fn save(&self, settings: Settings) -> BoxFuture<'static, SettingsResult<()>>;

    /// Point subsequent loads and saves at a settings file inside `directory`.
    /// Existing data is not migrated.
    fn set_working_directory(&self, directory: &Path);
}
