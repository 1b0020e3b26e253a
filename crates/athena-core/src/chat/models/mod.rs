pub mod document_context;
pub mod generation_slot;
pub mod message;

pub use document_context::DocumentContext;
pub use generation_slot::{GenerationGuard, GenerationSlot};
pub use message::{ContentType, Message, Sender};
