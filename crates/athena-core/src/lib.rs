pub mod chat;
pub mod config;
pub mod logging;
mod persistence;
pub mod settings;

pub use chat::{ChatError, ChatOrchestrator, ChatView};
pub use settings::{Settings, SettingsJsonRepository};
