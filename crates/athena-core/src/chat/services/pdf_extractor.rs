use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

/// Text of every page in document order, each followed by a newline.
///
/// A page whose text cannot be extracted contributes an empty line instead of
/// failing the whole document.
pub fn extract_pdf_text(path: &Path) -> Result<String, lopdf::Error> {
    let document = Document::load(path)?;
    let pages = document.get_pages();

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(page_text.trim_end_matches('\n')),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    page = page_number,
                    error = %e,
                    "No extractable text on page"
                );
            }
        }
        text.push('\n');
    }

    debug!(path = %path.display(), pages = pages.len(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::test_support::write_pdf;
    use super::*;

    #[test]
    fn test_pages_are_newline_terminated_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.pdf");
        write_pdf(&path, &[Some("A"), Some("B")]);

        assert_eq!(extract_pdf_text(&path).unwrap(), "A\nB\n");
    }

    #[test]
    fn test_page_without_text_contributes_empty_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scan.pdf");
        write_pdf(&path, &[Some("first"), None, Some("last")]);

        assert_eq!(extract_pdf_text(&path).unwrap(), "first\n\nlast\n");
    }

    #[test]
    fn test_not_a_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fake.pdf");
        std::fs::write(&path, b"This is not a valid PDF file").unwrap();

        assert!(extract_pdf_text(&path).is_err());
    }
}
