use std::path::Path;

use crate::chat::models::Message;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render messages as a plain-text transcript.
///
/// One block per message: a `--- sender (timestamp) ---` header, the content,
/// then a blank line.
pub fn format_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!(
            "--- {} ({}) ---\n{}\n\n",
            message.sender.display_name(),
            message.timestamp.format(TIMESTAMP_FORMAT),
            message.content
        ));
    }
    out
}

/// Write the transcript to `path`, replacing any existing file
pub fn write_transcript(path: &Path, messages: &[Message]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_transcript(messages))
}
