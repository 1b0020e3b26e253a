mod chat_orchestrator;

pub use chat_orchestrator::{
    ChatError, ChatOrchestrator, DOCUMENT_EMPTY_TEXT, DOCUMENT_FAILED_TEXT, DOCUMENT_READY_TEXT,
    GENERATION_FAILED_TEXT, MODELS_UNAVAILABLE_TEXT,
};
