use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{
    CHATS_DIR_NAME, DEFAULT_SERVER_URL, DOCUMENTS_DIR_NAME, default_workspace,
};

/// User-facing configuration, persisted as a flat JSON object.
///
/// Every field has a default so files written by older versions (or edited by
/// hand) load with the missing keys filled in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "ollama_url")]
    pub server_url: String,
    pub working_directory: PathBuf,
    pub theme: String,
    pub font_size: u32,
    pub max_tokens: u32,
    pub temperature: f64,
    pub auto_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            working_directory: default_workspace(),
            theme: "light_blue.xml".to_string(),
            font_size: 12,
            max_tokens: 2000,
            temperature: 0.7,
            auto_save: true,
        }
    }
}

impl Settings {
    pub fn documents_dir(&self) -> PathBuf {
        self.working_directory.join(DOCUMENTS_DIR_NAME)
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.working_directory.join(CHATS_DIR_NAME)
    }
}
