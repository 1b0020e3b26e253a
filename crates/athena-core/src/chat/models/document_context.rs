use std::path::{Path, PathBuf};

/// Extracted text of the most recently ingested document.
///
/// Built only from a complete extraction result and never edited afterwards;
/// a new upload replaces the whole value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentContext {
    source: PathBuf,
    text: String,
}

impl DocumentContext {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Prefix `message` with the document text block sent to the model
    pub fn wrap_prompt(&self, message: &str) -> String {
        format!("Document content: {}\n\n{}", self.text, message)
    }
}
