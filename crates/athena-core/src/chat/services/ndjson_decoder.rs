use serde::Deserialize;
use tracing::warn;

/// One line of an Ollama `/api/generate` stream
#[derive(Debug, Deserialize)]
struct GenerateFragment {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

/// What a complete line contributed to the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFragment {
    Text(String),
    Done,
}

/// Incremental decoder for newline-delimited JSON fragments.
///
/// Network chunks may end mid-line (or mid UTF-8 sequence), so bytes are
/// buffered until a newline arrives. Lines that fail to parse are logged and
/// dropped without affecting the rest of the stream.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    skipped: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the fragments of every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedFragment> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line[..line.len() - 1], &mut fragments);
        }
        fragments
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<DecodedFragment> {
        let line = std::mem::take(&mut self.buffer);
        let mut fragments = Vec::new();
        self.decode_line(&line, &mut fragments);
        fragments
    }

    /// Number of malformed lines dropped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, line: &[u8], fragments: &mut Vec<DecodedFragment>) {
        let line = line.trim_ascii();
        if line.is_empty() {
            return;
        }

        match serde_json::from_slice::<GenerateFragment>(line) {
            Ok(fragment) => {
                if let Some(text) = fragment.response
                    && !text.is_empty()
                {
                    fragments.push(DecodedFragment::Text(text));
                }
                if fragment.done {
                    fragments.push(DecodedFragment::Done);
                }
            }
            Err(e) => {
                self.skipped += 1;
                warn!(
                    line = %String::from_utf8_lossy(line),
                    error = %e,
                    "Failed to parse stream fragment, skipping"
                );
            }
        }
    }
}
