pub mod models;
pub mod repositories;

pub use models::Settings;
pub use repositories::{SettingsError, SettingsJsonRepository, SettingsRepository};
