pub mod transcript_exporter;

pub use transcript_exporter::{format_transcript, write_transcript};
