use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader as _};
use encoding_rs::WINDOWS_1251;
use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;
use zip::ZipArchive;

use crate::decode::decode_with_fallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
    Rtf,
    Csv,
    Xls,
    Xlsx,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "rtf" => Some(Self::Rtf),
            "csv" => Some(Self::Csv),
            "xls" => Some(Self::Xls),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Kind implied by the last path segment of a URL.
    pub fn from_url(url: &Url) -> Option<Self> {
        let last = url.path_segments()?.next_back()?;
        let (_, ext) = last.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported document type")]
    Unsupported,
    #[error("io error: {0}")]
    Io(String),
    #[error("pdf: {0}")]
    Pdf(String),
    #[error("word document: {0}")]
    Word(String),
    #[error("rtf: {0}")]
    Rtf(String),
    #[error("table: {0}")]
    Table(String),
    #[error("document contains no text")]
    NoText,
}

/// Turns a downloaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError>;

    /// Reads `path` and extracts it using the kind implied by its extension.
    fn extract_file(&self, path: &Path) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_path(path).ok_or(ExtractionError::Unsupported)?;
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::Io(e.to_string()))?;
        self.extract(&bytes, kind)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTextExtractor;

impl TextExtractor for DocumentTextExtractor {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
        let text = match kind {
            DocumentKind::Pdf => pdf_text(bytes)?,
            DocumentKind::Doc | DocumentKind::Docx => word_text(bytes)?,
            DocumentKind::Rtf => rtf_text(bytes)?,
            DocumentKind::Csv => csv_text(bytes)?,
            DocumentKind::Xls | DocumentKind::Xlsx => workbook_text(bytes)?,
        };
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed files.
    let owned = bytes.to_vec();
    std::panic::catch_unwind(move || pdf_extract::extract_text_from_mem(&owned))
        .map_err(|_| ExtractionError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))
}

/// Paragraph text of `word/document.xml`, paragraphs joined by a space.
fn word_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Word(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Word(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Word(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => current.push('\t'),
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractionError::Word(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Word(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs.join(" "))
}

fn rtf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let decoded = decode_with_fallback(bytes, WINDOWS_1251);
    let doc = rtf_parser::RtfDocument::try_from(decoded.text.as_str())
        .map_err(|e| ExtractionError::Rtf(e.to_string()))?;
    Ok(doc.body.iter().map(|block| block.text.as_str()).collect())
}

fn csv_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let decoded = decode_with_fallback(bytes, WINDOWS_1251);
    let delimiter = sniff_delimiter(&decoded.text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(decoded.text.as_bytes());

    let mut out = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractionError::Table(e.to_string()))?;
        let row: Vec<&str> = record.iter().map(str::trim).collect();
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    Ok(out)
}

/// Semicolons win over commas when the first line has more of them.
fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().next().unwrap_or_default();
    let semicolons = first.matches(';').count();
    let commas = first.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn workbook_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ExtractionError::Table(e.to_string()))?;

    let mut out = String::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ExtractionError::Table(e.to_string()))?;
        out.push_str(&format!("## {sheet_name}\n\n"));
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect();
            if cells.iter().all(String::is_empty) {
                continue;
            }
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_the_url_path_not_the_query() {
        let url = Url::parse("https://a.example/files/Offer.DOCX?v=2").unwrap();
        assert_eq!(DocumentKind::from_url(&url), Some(DocumentKind::Docx));
        let bare = Url::parse("https://a.example/").unwrap();
        assert_eq!(DocumentKind::from_url(&bare), None);
    }

    #[test]
    fn delimiter_sniffing_prefers_semicolons_when_dominant() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a,b;c"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }
}
