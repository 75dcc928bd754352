// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Local PDF inspection: document info, first-page text, DOI detection

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use super::Identifier;
use crate::{RenamerError, Result};

/// Cap on text taken from the whole-document fallback extractor, so that
/// DOIs cited in the reference list are not mistaken for the paper's own
const FALLBACK_TEXT_CHARS: usize = 3000;

/// Fields of the PDF document-information dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub page_count: usize,
}

/// What a PDF tells us locally
#[derive(Debug, Clone, Default)]
pub struct PdfContents {
    pub info: DocumentInfo,
    /// Whitespace-normalized text of the first page
    pub text: String,
}

/// Read document info and first-page text
pub fn read_pdf(path: &Path) -> Result<PdfContents> {
    let bytes = std::fs::read(path)?;
    let doc = lopdf::Document::load_mem(&bytes)
        .map_err(|e| RenamerError::Pdf(format!("Failed to load PDF: {}", e)))?;

    let info = read_info(&doc);

    let text = match first_page_text(&doc) {
        Some(text) => text,
        None => {
            debug!("No first-page text via lopdf for {:?}, trying pdf-extract", path);
            match pdf_extract::extract_text_from_mem(&bytes) {
                Ok(text) => text.chars().take(FALLBACK_TEXT_CHARS).collect(),
                Err(e) => {
                    debug!("Text extraction failed for {:?}: {}", path, e);
                    String::new()
                }
            }
        }
    };

    Ok(PdfContents {
        info,
        text: normalize_whitespace(&text),
    })
}

fn read_info(doc: &lopdf::Document) -> DocumentInfo {
    let mut info = DocumentInfo {
        page_count: doc.get_pages().len(),
        ..Default::default()
    };

    let Ok(info_obj) = doc.trailer.get(b"Info") else {
        return info;
    };
    let dict = match info_obj.as_reference() {
        Ok(id) => doc.get_dictionary(id).ok(),
        Err(_) => info_obj.as_dict().ok(),
    };
    let Some(dict) = dict else {
        return info;
    };

    info.title = info_field(dict, b"Title");
    info.subject = info_field(dict, b"Subject");
    info.keywords = info_field(dict, b"Keywords");
    info
}

fn info_field(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|value| value.as_str().ok())
        .map(decode_pdf_string)
        .map(|s| normalize_whitespace(&s))
        .filter(|s| !s.is_empty())
}

fn first_page_text(doc: &lopdf::Document) -> Option<String> {
    let first = *doc.get_pages().keys().next()?;
    match doc.extract_text(&[first]) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!("lopdf text extraction failed: {}", e);
            None
        }
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise treated as Latin-1 compatible bytes
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn doi_regex() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"(?i)\b(10\.\d{4,9}/[-._;()/:a-z0-9]+)").expect("valid regex"))
}

/// First DOI-looking string in `text`, with trailing punctuation removed
pub fn find_doi(text: &str) -> Option<String> {
    let raw = doi_regex().captures(text)?.get(1)?.as_str();
    let mut doi = raw.trim_end_matches(['.', ',', ';', ':']);

    // A closing parenthesis belongs to the DOI only if it is balanced
    while doi.ends_with(')') && doi.matches(')').count() > doi.matches('(').count() {
        doi = doi[..doi.len() - 1].trim_end_matches(['.', ',', ';', ':']);
    }

    (doi.contains('/') && !doi.ends_with('/')).then(|| doi.to_string())
}

/// Whether a document-info title looks like a real paper title rather
/// than an authoring-tool artefact
pub fn is_plausible_title(title: &str) -> bool {
    let len = title.chars().count();
    if !(10..=300).contains(&len) || title.split_whitespace().count() < 2 {
        return false;
    }
    let lower = title.to_lowercase();
    const ARTEFACTS: &[&str] = &[
        "microsoft word", ".doc", ".tex", ".dvi", ".pdf", "untitled", "powerpoint", "latex",
    ];
    !ARTEFACTS.iter().any(|a| lower.contains(a))
}

/// Identifiers to try, most specific first
pub fn candidates(contents: &PdfContents, max_query_chars: usize) -> Vec<Identifier> {
    let info = &contents.info;
    let mut out = Vec::new();

    let doi = [
        info.subject.as_deref(),
        info.keywords.as_deref(),
        info.title.as_deref(),
        Some(contents.text.as_str()),
    ]
    .into_iter()
    .flatten()
    .find_map(find_doi);
    if let Some(doi) = doi {
        out.push(Identifier::Doi(doi));
    }

    if let Some(title) = info.title.as_deref().filter(|t| is_plausible_title(t)) {
        out.push(Identifier::Query(title.to_string()));
    }

    let snippet: String = contents.text.chars().take(max_query_chars).collect();
    let snippet = snippet.trim();
    if !snippet.is_empty() && !out.iter().any(|id| matches!(id, Identifier::Query(q) if q == snippet)) {
        out.push(Identifier::Query(snippet.to_string()));
    }

    out
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Write a one-page PDF with the given document-info entries
#[cfg(test)]
pub(crate) fn write_sample_pdf(path: &Path, title: Option<&str>, subject: Option<&str>) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
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
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal("Sample paper body")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
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

    let mut info = Dictionary::new();
    if let Some(title) = title {
        info.set("Title", Object::string_literal(title));
    }
    if let Some(subject) = subject {
        info.set("Subject", Object::string_literal(subject));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    doc.save(path).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_doi() {
        assert_eq!(
            find_doi("Published online. doi:10.1038/nature12373. Received 2013").as_deref(),
            Some("10.1038/nature12373")
        );
        assert_eq!(
            find_doi("(see https://doi.org/10.1103/PhysRevLett.116.135502)").as_deref(),
            Some("10.1103/PhysRevLett.116.135502")
        );
        assert_eq!(
            find_doi("DOI 10.1002/(SICI)1097-4636(199706)35:4<403::AID-JBM1>3.0.CO;2-E").as_deref(),
            Some("10.1002/(SICI)1097-4636(199706)35:4")
        );
        assert_eq!(find_doi("version 10.2 of the code"), None);
        assert_eq!(find_doi("nothing here"), None);
    }

    #[test]
    fn test_plausible_titles() {
        assert!(is_plausible_title("Room temperature plasticity in amorphous SiO2"));
        assert!(!is_plausible_title("Microsoft Word - draft_v3.docx"));
        assert!(!is_plausible_title("paper.pdf"));
        assert!(!is_plausible_title("Short"));
        assert!(!is_plausible_title("Onewordbutquitelongtitle"));
    }

    #[test]
    fn test_decode_utf16_title() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Über".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Über");
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
        assert_eq!(decode_pdf_string(&[0x4D, 0xFC, 0x6C]), "Mül");
    }

    #[test]
    fn test_candidates_order() {
        let contents = PdfContents {
            info: DocumentInfo {
                title: Some("Grain boundary sliding in nanocrystalline copper".to_string()),
                subject: Some("Acta Mater. 2021, doi:10.1016/j.actamat.2021.116789".to_string()),
                ..Default::default()
            },
            text: "Grain boundary sliding in nanocrystalline copper A. Author".to_string(),
        };
        let ids = candidates(&contents, 20);
        assert_eq!(
            ids,
            vec![
                Identifier::Doi("10.1016/j.actamat.2021.116789".to_string()),
                Identifier::Query("Grain boundary sliding in nanocrystalline copper".to_string()),
                Identifier::Query("Grain boundary slidi".to_string()),
            ]
        );
    }

    #[test]
    fn test_candidates_empty_document() {
        assert!(candidates(&PdfContents::default(), 500).is_empty());
    }

    #[test]
    fn test_read_info_from_generated_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        write_sample_pdf(&path, Some("Dislocation  nucleation at crack tips"), Some("doi:10.1234/abc.5"));

        let contents = read_pdf(&path).unwrap();
        assert_eq!(contents.info.title.as_deref(), Some("Dislocation nucleation at crack tips"));
        assert_eq!(contents.info.page_count, 1);
        assert_eq!(
            candidates(&contents, 500).first(),
            Some(&Identifier::Doi("10.1234/abc.5".to_string()))
        );
    }

    #[test]
    fn test_read_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "not a pdf").unwrap();
        assert!(matches!(read_pdf(&path), Err(RenamerError::Pdf(_))));
    }
}
