//! Document Parser
//!
//! Pure Rust text extraction from attachment bytes. No system libraries
//! (Tesseract, pdfium) are required; scanned PDFs without a text layer come
//! back as [`ExtractionFailure::EmptyContent`].

use calamine::{open_workbook_from_rs, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};

use super::{DocumentFormat, ExtractionFailure, TextExtractor};
use crate::models::Document;

/// Maximum text length to extract (to avoid memory issues with huge docs)
const MAX_TEXT_LENGTH: usize = 500_000; // ~500KB of text

/// Document parser using pure Rust crates
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from raw bytes of a known format
    pub fn parse_bytes(
        &self,
        format: DocumentFormat,
        bytes: &[u8],
    ) -> Result<String, ExtractionFailure> {
        if bytes.is_empty() {
            return Err(ExtractionFailure::EmptyContent);
        }

        let raw = match format {
            DocumentFormat::Pdf => Self::extract_pdf(bytes)?,
            DocumentFormat::Docx => Self::extract_docx(bytes)?,
            DocumentFormat::Xlsx => {
                let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e| corrupt(format, e))?;
                Self::extract_sheets(&mut workbook)
            }
            DocumentFormat::Xls => {
                let mut workbook: Xls<_> = open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e| corrupt(format, e))?;
                Self::extract_sheets(&mut workbook)
            }
            DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
        };

        let text = Self::clean_text(&raw);
        if text.is_empty() {
            return Err(ExtractionFailure::EmptyContent);
        }

        Ok(Self::truncate_text(text))
    }

    /// Extract text from PDF using pdf-extract
    /// Wrapped in catch_unwind to handle panics from malformed PDFs
    fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionFailure> {
        // pdf-extract (and its font parsers) can panic on malformed glyph tables
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        })) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(corrupt(DocumentFormat::Pdf, e)),
            Err(_panic) => {
                tracing::error!("[DocumentParser] PDF extraction panicked - likely malformed font/glyph");
                Err(ExtractionFailure::CorruptSource {
                    format: DocumentFormat::Pdf.as_str().to_string(),
                    reason: "parser panicked on malformed content".to_string(),
                })
            }
        }
    }

    /// Extract text from DOCX using docx-rs
    fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionFailure> {
        let doc = docx_rs::read_docx(bytes).map_err(|e| corrupt(DocumentFormat::Docx, e))?;

        let mut output = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(para) => {
                    Self::collect_runs(&para.children, &mut output);
                    output.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => {
                    for row in &table.rows {
                        let docx_rs::TableChild::TableRow(tr) = row;
                        for cell in &tr.cells {
                            let docx_rs::TableRowChild::TableCell(tc) = cell;
                            for content in &tc.children {
                                if let docx_rs::TableCellContent::Paragraph(para) = content {
                                    Self::collect_runs(&para.children, &mut output);
                                    output.push_str(" | ");
                                }
                            }
                        }
                        output.push('\n');
                    }
                }
                _ => {}
            }
        }

        Ok(output)
    }

    /// Append the text runs of a paragraph, descending into hyperlinks
    fn collect_runs(children: &[docx_rs::ParagraphChild], output: &mut String) {
        for child in children {
            match child {
                docx_rs::ParagraphChild::Run(run) => {
                    for run_child in &run.children {
                        if let docx_rs::RunChild::Text(text) = run_child {
                            output.push_str(&text.text);
                        }
                    }
                }
                docx_rs::ParagraphChild::Hyperlink(link) => {
                    Self::collect_runs(&link.children, output);
                }
                _ => {}
            }
        }
    }

    /// Flatten every readable sheet into pipe-separated rows.
    /// Unreadable sheets are skipped, never padded with placeholder text.
    fn extract_sheets<RS, R>(workbook: &mut R) -> String
    where
        RS: Read + Seek,
        R: Reader<RS>,
    {
        let mut all_text = String::new();
        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

        for sheet_name in &sheet_names {
            let range = match workbook.worksheet_range(sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!(sheet = %sheet_name, "[DocumentParser] Skipping unreadable sheet: {:?}", e);
                    continue;
                }
            };

            let mut sheet_text = String::new();
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string())
                    .filter(|s| !s.trim().is_empty())
                    .collect();

                if !cells.is_empty() {
                    sheet_text.push_str(&cells.join(" | "));
                    sheet_text.push('\n');
                }
            }

            // Headers only for sheets that actually carry content
            if !sheet_text.is_empty() {
                all_text.push_str(&format!("=== Sheet: {} ===\n", sheet_name));
                all_text.push_str(&sheet_text);
            }
        }

        all_text
    }

    /// Clean extracted text
    fn clean_text(text: &str) -> String {
        text.lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Truncate text to max length on a char boundary, preferring line or word breaks
    fn truncate_text(text: String) -> String {
        if text.len() <= MAX_TEXT_LENGTH {
            return text;
        }

        let mut cut = MAX_TEXT_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = &text[..cut];

        if let Some(pos) = truncated.rfind('\n') {
            return truncated[..pos].to_string();
        }
        if let Some(pos) = truncated.rfind(' ') {
            return truncated[..pos].to_string();
        }

        truncated.to_string()
    }
}

impl TextExtractor for DocumentParser {
    fn extract(&self, document: &Document) -> Result<String, ExtractionFailure> {
        let format = DocumentFormat::detect(document)?;
        let result = self.parse_bytes(format, &document.bytes);

        match &result {
            Ok(text) => tracing::debug!(
                file = %document.file_name(),
                format = format.as_str(),
                chars = text.len(),
                "[DocumentParser] Extracted text"
            ),
            Err(e) => tracing::warn!(
                file = %document.file_name(),
                format = format.as_str(),
                "[DocumentParser] Extraction failed: {}",
                e
            ),
        }

        result
    }
}

fn corrupt(format: DocumentFormat, err: impl std::fmt::Display) -> ExtractionFailure {
    ExtractionFailure::CorruptSource {
        format: format.as_str().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = docx_rs::Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
            );
        }
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    /// Minimal one-page PDF; `None` leaves the page without a content stream
    fn pdf_bytes(text: Option<&str>) -> Vec<u8> {
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        ];
        match text {
            Some(text) => {
                let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
                objects.push(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                     /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                        .to_string(),
                );
                objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
                objects.push(format!(
                    "<< /Length {} >>\nstream\n{}\nendstream",
                    stream.len(),
                    stream
                ));
            }
            None => objects.push(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string(),
            ),
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
        );
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    /// Minimal XLSX with inline-string cells. A sheet with `None` rows is
    /// listed in the workbook but its part is missing from the archive.
    fn xlsx_bytes(sheets: &[(&str, Option<&str>)]) -> Vec<u8> {
        use std::io::Write;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let mut add = |name: String, body: String| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        let mut sheet_list = String::new();
        let mut rels = String::new();
        for (i, (name, rows)) in sheets.iter().enumerate() {
            let n = i + 1;
            sheet_list.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
            if let Some(rows) = rows {
                add(
                    format!("xl/worksheets/sheet{}.xml", n),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                        rows
                    ),
                );
            }
        }

        add(
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#.to_string(),
        );
        add(
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        );
        add(
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
                sheet_list
            ),
        );
        add(
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                rels
            ),
        );

        zip.finish().unwrap().into_inner()
    }

    const ACCOUNT_ROWS: &str = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Account</t></is></c><c r="B1" t="inlineStr"><is><t>Balance</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>Chase 1234</t></is></c><c r="B2"><v>1520.5</v></c></row>"#;

    fn loaded(name: &str, bytes: Vec<u8>) -> Document {
        let mut doc = Document::discovered(PathBuf::from(name), None);
        doc.bytes = bytes;
        doc
    }

    #[test]
    fn test_plain_text_parsing() {
        let doc = loaded(
            "notes.txt",
            b"  Chase Bank statement  \n\n  Account ending 1234  \n".to_vec(),
        );
        let text = DocumentParser::new().extract(&doc).unwrap();
        assert_eq!(text, "Chase Bank statement\nAccount ending 1234");
    }

    #[test]
    fn test_docx_parsing() {
        let doc = loaded(
            "letter.docx",
            docx_bytes(&["Summons and Complaint", "Case No. 2024-CV-001"]),
        );
        let text = DocumentParser::new().extract(&doc).unwrap();
        assert!(text.contains("Summons and Complaint"));
        assert!(text.contains("Case No. 2024-CV-001"));
    }

    #[test]
    fn test_pdf_parsing() {
        let doc = loaded("statement.pdf", pdf_bytes(Some("Chase Bank 1234")));
        let text = DocumentParser::new().extract(&doc).unwrap();
        assert!(text.contains("Chase Bank 1234"), "got {:?}", text);
    }

    #[test]
    fn test_pdf_without_text_layer_is_empty_content() {
        let doc = loaded("scan.pdf", pdf_bytes(None));
        assert_eq!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::EmptyContent)
        );
    }

    #[test]
    fn test_xlsx_parsing() {
        let doc = loaded(
            "accounts.xlsx",
            xlsx_bytes(&[("Accounts", Some(ACCOUNT_ROWS)), ("Notes", Some(""))]),
        );
        let text = DocumentParser::new().extract(&doc).unwrap();
        assert_eq!(
            text,
            "=== Sheet: Accounts ===\nAccount | Balance\nChase 1234 | 1520.5"
        );
    }

    #[test]
    fn test_xlsx_unreadable_sheet_is_skipped() {
        let doc = loaded(
            "accounts.xlsx",
            xlsx_bytes(&[("Archive", None), ("Accounts", Some(ACCOUNT_ROWS))]),
        );
        let text = DocumentParser::new().extract(&doc).unwrap();
        assert!(!text.contains("Archive"));
        assert!(text.starts_with("=== Sheet: Accounts ==="));
    }

    #[test]
    fn test_xlsx_without_readable_text_is_empty_content() {
        let doc = loaded(
            "blank.xlsx",
            xlsx_bytes(&[("Archive", None), ("Blank", Some(""))]),
        );
        assert_eq!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::EmptyContent)
        );
    }

    #[test]
    fn test_garbage_spreadsheets_are_corrupt_source() {
        let parser = DocumentParser::new();
        for name in ["broken.xlsx", "broken.xls"] {
            let doc = loaded(name, b"not a workbook".to_vec());
            assert!(
                matches!(parser.extract(&doc), Err(ExtractionFailure::CorruptSource { .. })),
                "{} should be CorruptSource",
                name
            );
        }
    }

    #[test]
    fn test_empty_docx_is_empty_content() {
        let doc = loaded("blank.docx", docx_bytes(&[]));
        assert_eq!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::EmptyContent)
        );
    }

    #[test]
    fn test_zero_byte_files_are_empty_content() {
        let parser = DocumentParser::new();
        for name in ["empty.pdf", "empty.docx", "empty.xlsx", "empty.txt"] {
            let doc = loaded(name, Vec::new());
            assert_eq!(
                parser.extract(&doc),
                Err(ExtractionFailure::EmptyContent),
                "{} should be EmptyContent",
                name
            );
        }
    }

    #[test]
    fn test_whitespace_only_text_is_empty_content() {
        let doc = loaded("blank.txt", b"   \n\t\n  ".to_vec());
        assert_eq!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::EmptyContent)
        );
    }

    #[test]
    fn test_garbage_pdf_is_corrupt_source() {
        let doc = loaded("broken.pdf", b"this is definitely not a pdf".to_vec());
        assert!(matches!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::CorruptSource { .. })
        ));
    }

    #[test]
    fn test_garbage_docx_is_corrupt_source() {
        let doc = loaded("broken.docx", b"PK not really a zip".to_vec());
        assert!(matches!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::CorruptSource { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let doc = loaded("scan.tiff", b"II*\0".to_vec());
        assert_eq!(
            DocumentParser::new().extract(&doc),
            Err(ExtractionFailure::UnsupportedFormat {
                extension: "tiff".to_string()
            })
        );
    }

    #[test]
    fn test_truncate_text_respects_char_boundaries() {
        let long_text = "é".repeat(MAX_TEXT_LENGTH);
        let truncated = DocumentParser::truncate_text(long_text);
        assert!(truncated.len() <= MAX_TEXT_LENGTH);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_clean_text() {
        let messy = "  Line 1  \n\n  Line 2  \n  \n  Line 3  ";
        assert_eq!(DocumentParser::clean_text(messy), "Line 1\nLine 2\nLine 3");
    }
}
