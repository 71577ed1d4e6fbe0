use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use paperchat_schema::{ChatError, Document};

/// Read one PDF from disk and extract its text, page by page in page order.
///
/// Anything that keeps the file out of the pipeline (missing, zero-byte,
/// unparsable, no extractable text) is an input error naming the file, so a
/// multi-file upload can keep going.
pub fn load_pdf(path: &Path) -> Result<Document, ChatError> {
    let source = path.display().to_string();

    let metadata = std::fs::metadata(path)
        .map_err(|err| ChatError::input(&source, format!("cannot read file: {err}")))?;
    if metadata.len() == 0 {
        return Err(ChatError::input(&source, "file is empty"));
    }

    let doc = lopdf::Document::load(path)
        .map_err(|err| ChatError::input(&source, format!("not a readable PDF: {err}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut text = String::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push(' ');
            }
            Err(err) => {
                tracing::warn!(source = %source, page = *page_number, "failed to extract page text: {err}");
            }
        }
    }

    let cleaned = clean_text(&text);
    if cleaned.is_empty() {
        return Err(ChatError::input(&source, "no extractable text"));
    }

    tracing::info!(source = %source, pages = page_count, chars = cleaned.len(), "loaded pdf");
    Ok(Document::new(source, cleaned, page_count))
}

/// Load a batch of PDFs. Per-file failures are collected, not fatal.
pub fn load_batch(paths: &[impl AsRef<Path>]) -> (Vec<Document>, Vec<ChatError>) {
    let mut documents = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match load_pdf(path.as_ref()) {
            Ok(doc) => documents.push(doc),
            Err(err) => failures.push(err),
        }
    }
    (documents, failures)
}

/// Collapse whitespace runs and drop bytes that PDF extraction tends to
/// smuggle in (control characters, replacement glyphs).
pub fn clean_text(raw: &str) -> String {
    static JUNK: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let junk = JUNK.get_or_init(|| Regex::new(r"[\p{Cc}\p{Cf}\u{FFFD}]").expect("junk pattern"));
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"));

    let stripped = junk.replace_all(raw, " ");
    whitespace.replace_all(&stripped, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a minimal single-page PDF containing `text`.
    fn write_test_pdf(path: &Path, text: &str) {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("save pdf");
    }

    #[test]
    fn loads_single_page_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paris.pdf");
        write_test_pdf(&path, "The capital of France is Paris.");

        let doc = load_pdf(&path).unwrap();
        assert_eq!(doc.page_count, 1);
        assert!(doc.text.contains("The capital of France is Paris."));
        assert_eq!(doc.source, path.display().to_string());
    }

    #[test]
    fn zero_byte_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let err = load_pdf(&path).unwrap_err();
        assert!(matches!(err, ChatError::Input { .. }));
        assert!(err.to_string().contains("empty.pdf"));
    }

    #[test]
    fn non_pdf_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"plain text, not a pdf").unwrap();

        let err = load_pdf(&path).unwrap_err();
        assert!(matches!(err, ChatError::Input { .. }));
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = load_pdf(Path::new("/does/not/exist.pdf")).unwrap_err();
        assert!(matches!(err, ChatError::Input { .. }));
    }

    #[test]
    fn batch_keeps_going_past_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        write_test_pdf(&good, "some real content here");
        std::fs::write(&bad, b"").unwrap();

        let (documents, failures) = load_batch(&[bad.as_path(), good.as_path()]);
        assert_eq!(documents.len(), 1);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("bad.pdf"));
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\nb\t c  "), "a b c");
    }

    #[test]
    fn clean_text_strips_control_chars() {
        assert_eq!(clean_text("a\u{0000}b\u{FFFD}c"), "a b c");
    }
}
