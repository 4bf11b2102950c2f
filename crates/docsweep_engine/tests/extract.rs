use std::io::{Cursor, Write};

use docsweep_engine::{DocumentKind, DocumentTextExtractor, ExtractionError, TextExtractor};
use pretty_assertions::assert_eq;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn docx_with(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[test]
fn docx_paragraphs_are_joined_by_spaces() {
    sweep_logging::initialize_for_tests();
    let bytes = docx_with(&["Договор оферты", "", "Условия &amp; сроки"]);
    let text = DocumentTextExtractor
        .extract(&bytes, DocumentKind::Docx)
        .unwrap();
    assert_eq!(text, "Договор оферты Условия & сроки");
}

#[test]
fn legacy_doc_that_is_not_ooxml_fails_cleanly() {
    let result = DocumentTextExtractor.extract(b"\xD0\xCF\x11\xE0 binary", DocumentKind::Doc);
    assert!(matches!(result, Err(ExtractionError::Word(_))));
}

#[test]
fn csv_rows_become_tab_separated_lines() {
    let text = DocumentTextExtractor
        .extract("Имя;Цена\nСтол;100\n;\n".as_bytes(), DocumentKind::Csv)
        .unwrap();
    assert_eq!(text, "Имя\tЦена\nСтол\t100\n");
}

#[test]
fn csv_in_windows_1251_is_decoded() {
    // "Цена;1" in windows-1251
    let bytes = b"\xD6\xE5\xED\xE0;1\n";
    let text = DocumentTextExtractor.extract(bytes, DocumentKind::Csv).unwrap();
    assert_eq!(text, "Цена\t1\n");
}

#[test]
fn empty_table_is_no_text() {
    let result = DocumentTextExtractor.extract(b";;\n;\n", DocumentKind::Csv);
    assert_eq!(result, Err(ExtractionError::NoText));
}

#[test]
fn rtf_body_text_is_returned() {
    let rtf = br"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times New Roman;}}\f0\fs24 Hello world}";
    let text = DocumentTextExtractor.extract(rtf, DocumentKind::Rtf).unwrap();
    assert!(text.contains("Hello world"), "got {text:?}");
}

#[test]
fn garbage_pdf_is_an_error_not_a_panic() {
    let result = DocumentTextExtractor.extract(b"%PDF-1.4 truncated", DocumentKind::Pdf);
    assert!(matches!(result, Err(ExtractionError::Pdf(_))));
}

#[test]
fn garbage_workbook_is_a_table_error() {
    let result = DocumentTextExtractor.extract(b"not a workbook", DocumentKind::Xlsx);
    assert!(matches!(result, Err(ExtractionError::Table(_))));
}

#[test]
fn extract_file_infers_the_kind_from_the_extension() {
    let temp = tempfile::TempDir::new().unwrap();
    let csv = temp.path().join("prices.CSV");
    std::fs::write(&csv, "a,b\n").unwrap();
    assert_eq!(DocumentTextExtractor.extract_file(&csv).unwrap(), "a\tb\n");

    let unknown = temp.path().join("notes.txt");
    std::fs::write(&unknown, "hello").unwrap();
    assert_eq!(
        DocumentTextExtractor.extract_file(&unknown),
        Err(ExtractionError::Unsupported)
    );
}
