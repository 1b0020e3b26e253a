pub mod completion_client;
pub mod document_service;
pub mod docx_extractor;
pub mod ndjson_decoder;
pub mod pdf_extractor;

pub use completion_client::{CompletionClient, CompletionError, FragmentStream, GenerationOptions};
pub use document_service::{DocumentError, DocumentService};
