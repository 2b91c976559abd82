//! Per-format text extraction from raw document bytes.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;

use rankdb_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "text",
        }
    }

    /// PDF magic wins over the extension; `.docx` is only trusted when the
    /// bytes are a ZIP container. Anything else is read as text.
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        if has_pdf_magic(bytes) {
            return Self::Pdf;
        }
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("docx") if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) => Self::Docx,
            Some("pdf") => Self::Pdf,
            _ => Self::PlainText,
        }
    }
}

fn has_pdf_magic(bytes: &[u8]) -> bool {
    let mut slice = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    while let Some((first, rest)) = slice.split_first() {
        if !first.is_ascii_whitespace() { break; }
        slice = rest;
    }
    slice.starts_with(b"%PDF")
}

pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Page texts joined with newlines.
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed inputs.
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match outcome {
        Ok(Ok(pages)) => Ok(join_pages(&pages)),
        Ok(Err(e)) => Err(Error::Operation(format!("pdf extraction failed: {:?}", e))),
        Err(_) => Err(Error::Operation("pdf extraction panicked".to_string())),
    }
}

fn join_pages(pages: &[String]) -> String {
    pages.join("\n")
}

/// Paragraph texts of `word/document.xml`, joined with newlines.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Operation(format!("not a docx container: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::Operation(format!("docx has no document body: {}", e)))?
        .read_to_string(&mut xml)?;
    Ok(docx_paragraphs(&xml)?.join("\n"))
}

fn docx_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| Error::Operation(format!("bad docx text: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Operation(format!("malformed docx xml: {}", e))),
            _ => {}
        }
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic_beats_extension() {
        assert_eq!(DocumentFormat::detect(Path::new("cv.txt"), b"\n %PDF-1.7"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect(Path::new("cv.docx"), b"plain"), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::detect(Path::new("cv.md"), b"# cv"), DocumentFormat::PlainText);
    }

    #[test]
    fn docx_paragraphs_join_runs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Senior</w:t></w:r><w:r><w:t xml:space="preserve"> Engineer</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>Rust &amp; Go</w:t><w:tab/><w:t>2019</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let paragraphs = docx_paragraphs(xml).unwrap();
        assert_eq!(paragraphs, vec!["Senior Engineer", "", "Rust & Go\t2019"]);
    }

    #[test]
    fn invalid_utf8_text_is_decoded_lossily() {
        let text = extract_text(DocumentFormat::PlainText, &[b'o', b'k', 0xFF]).unwrap();
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn pdf_pages_are_newline_separated() {
        let pages = vec!["Jane Doe\nRust".to_string(), "Experience".to_string(), String::new()];
        assert_eq!(join_pages(&pages), "Jane Doe\nRust\nExperience\n");
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn garbage_pdf_is_an_error_not_a_panic() {
        assert!(extract_text(DocumentFormat::Pdf, b"%PDF-1.4 truncated").is_err());
    }
}
