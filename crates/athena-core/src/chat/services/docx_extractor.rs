use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::debug;

/// Main document part inside a `.docx` package
const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Word package: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document text is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Text of every paragraph in document order, joined by newlines.
pub fn extract_docx_text(path: &Path) -> Result<String, DocxError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;

    let paragraphs = paragraphs_from_xml(&xml)?;
    debug!(path = %path.display(), paragraphs = paragraphs.len(), "Extracted Word text");
    Ok(paragraphs.join("\n"))
}

/// Walk WordprocessingML and collect the visible text of each `w:p`.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) => {
                if let Some(paragraph) = current.as_mut() {
                    match e.local_name().as_ref() {
                        b"tab" => paragraph.push('\t'),
                        b"br" | b"cr" => paragraph.push('\n'),
                        _ => {}
                    }
                }
                // `<w:p/>` is an empty paragraph
                if e.local_name().as_ref() == b"p" {
                    paragraphs.push(String::new());
                }
            }
            Event::Text(t) => {
                if in_text_run && let Some(paragraph) = current.as_mut() {
                    paragraph.push_str(std::str::from_utf8(&t)?);
                }
            }
            Event::GeneralRef(r) => {
                if in_text_run
                    && let Some(paragraph) = current.as_mut()
                    && let Some(ch) = resolve_entity(&r)
                {
                    paragraph.push(ch);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Resolve a predefined XML entity or character reference (`amp`, `#39`, `#x2019`)
fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => std::str::from_utf8(hex)
            .ok()
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32),
        [b'#', dec @ ..] => std::str::from_utf8(dec)
            .ok()
            .and_then(|d| d.parse::<u32>().ok())
            .and_then(char::from_u32),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;

    /// Wrap `body` (WordprocessingML paragraphs) into a minimal `.docx` file
    pub(crate) fn write_docx(path: &Path, body: &str) {
        let xml = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                "<w:body>{}</w:body></w:document>"
            ),
            body
        );

        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    /// `<w:p>` with a single run per entry
    pub(crate) fn paragraphs(lines: &[&str]) -> String {
        lines
            .iter()
            .map(|line| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", line))
            .collect()
    }
}
