use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use super::docx_extractor::extract_docx_text;
use super::pdf_extractor::extract_pdf_text;
use crate::config::DOCUMENTS_DIR_NAME;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("Error processing document {}: {source}", path.display())]
    ProcessingFailure {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl DocumentError {
    fn processing(path: &Path, source: impl Into<BoxError>) -> Self {
        Self::ProcessingFailure {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// Supported upload formats, keyed by lower-cased extension
enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Copies uploads into `<working_directory>/documents/` and extracts their text.
pub struct DocumentService {
    documents_dir: Mutex<PathBuf>,
}

impl DocumentService {
    /// Create the service, making sure the documents folder exists
    pub fn new(working_directory: &Path) -> std::io::Result<Self> {
        let documents_dir = working_directory.join(DOCUMENTS_DIR_NAME);
        std::fs::create_dir_all(&documents_dir)?;
        Ok(Self {
            documents_dir: Mutex::new(documents_dir),
        })
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir.lock().clone()
    }

    /// Repoint the documents folder, creating it if absent
    pub fn set_working_directory(&self, working_directory: &Path) -> std::io::Result<()> {
        let documents_dir = working_directory.join(DOCUMENTS_DIR_NAME);
        std::fs::create_dir_all(&documents_dir)?;
        info!(path = %documents_dir.display(), "Documents folder updated");
        *self.documents_dir.lock() = documents_dir;
        Ok(())
    }

    /// Copy `source` into the documents folder and return its plain text.
    ///
    /// File work runs on the blocking pool. A same-named earlier upload is
    /// overwritten. The copy is kept even when the format turns out to be
    /// unsupported.
    pub async fn ingest(&self, source: &Path) -> Result<String, DocumentError> {
        let documents_dir = self.documents_dir();
        let source = source.to_path_buf();

        tokio::task::spawn_blocking({
            let source = source.clone();
            move || ingest_blocking(&documents_dir, &source)
        })
        .await
        .map_err(|e| DocumentError::processing(&source, e))?
    }
}

fn ingest_blocking(documents_dir: &Path, source: &Path) -> Result<String, DocumentError> {
    let file_name = source.file_name().ok_or_else(|| {
        DocumentError::processing(source, format!("{} has no file name", source.display()))
    })?;

    let working_copy = documents_dir.join(file_name);
    copy_into(source, &working_copy).map_err(|e| DocumentError::processing(source, e))?;
    debug!(from = %source.display(), to = %working_copy.display(), "Copied upload");

    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let text = match DocumentFormat::from_extension(&extension) {
        Some(DocumentFormat::Pdf) => {
            extract_pdf_text(&working_copy).map_err(|e| DocumentError::processing(source, e))?
        }
        Some(DocumentFormat::Docx) => {
            extract_docx_text(&working_copy).map_err(|e| DocumentError::processing(source, e))?
        }
        None => return Err(DocumentError::UnsupportedFormat { extension }),
    };

    info!(path = %source.display(), chars = text.len(), "Document ingested");
    Ok(text)
}

/// `std::fs::copy` truncates the destination first, which would wipe a file
/// that is re-uploaded from the documents folder itself.
fn copy_into(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if destination.exists()
        && std::fs::canonicalize(source)? == std::fs::canonicalize(destination)?
    {
        return Ok(());
    }

    std::fs::copy(source, destination)?;
    Ok(())
}
