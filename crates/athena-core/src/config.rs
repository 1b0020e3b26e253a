use std::path::PathBuf;

pub const APP_NAME: &str = "Athena AI Assistant";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ollama listens here unless the user points us elsewhere
pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DOCUMENTS_DIR_NAME: &str = "documents";
pub const CHATS_DIR_NAME: &str = "chats";
pub const LOG_FILE_NAME: &str = "athena.log";

/// `~/Athena_Workspace`, or a relative `Athena_Workspace` when no home directory can be resolved.
pub fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Athena_Workspace"))
        .unwrap_or_else(|| PathBuf::from("Athena_Workspace"))
}
