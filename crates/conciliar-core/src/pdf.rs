//! Correos invoice PDF pipeline.
//!
//! A Correos XML carries no usable detail lines; the real invoice data lives
//! in a PDF saved next to it. This module locates that PDF by filename
//! heuristics, pulls its text, and runs the field extraction that produces
//! the single detail line stored in the company index.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::debug;

use crate::error::PdfError;
use crate::extract::FacturaExtractor;

/// Text pulled from one PDF, with page accounting.
#[derive(Debug, Clone)]
pub struct PdfText {
    pub text: String,
    pub pages_total: usize,
    pub pages_empty: usize,
}

/// Processor for Correos invoice PDFs found next to their source XML.
#[derive(Debug, Default)]
pub struct CorreosPdfProcessor {
    extractor: FacturaExtractor,
}

impl CorreosPdfProcessor {
    pub fn new() -> Self {
        Self {
            extractor: FacturaExtractor::new(),
        }
    }

    /// Run the full pipeline for one XML: locate the sibling PDF, extract
    /// its text, extract the invoice fields, and format the detail line.
    pub fn process(&self, xml_path: &Path) -> Result<String, PdfError> {
        let pdf_path = find_associated_pdf(xml_path).ok_or_else(|| {
            PdfError::NotFound(
                xml_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        debug!("associated PDF: {}", pdf_path.display());

        let pdf_text = self.extract_pdf_text(&pdf_path)?;
        let extraction = self.extractor.extract(&pdf_text.text)?;

        Ok(extraction.formatted())
    }

    /// Extract the full text of a PDF, tolerating pages that yield nothing.
    ///
    /// Zero text across every page is a failure; single empty pages are only
    /// counted.
    pub fn extract_pdf_text(&self, pdf_path: &Path) -> Result<PdfText, PdfError> {
        let data = fs::read(pdf_path).map_err(|e| PdfError::Parse(e.to_string()))?;

        let mut doc = Document::load_mem(&data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            // Empty-password encryption is common on generated invoices.
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
        }

        let pages_total = doc.get_pages().len();
        if pages_total == 0 {
            return Err(PdfError::NoPages);
        }

        let (text, pages_empty) = match pdf_extract::extract_text_from_mem_by_pages(&data) {
            Ok(pages) => {
                let pages_empty = pages.iter().filter(|p| p.trim().is_empty()).count();
                let text = pages
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                (text, pages_empty)
            }
            Err(e) => {
                debug!("per-page extraction failed ({e}), retrying whole document");
                let text = pdf_extract::extract_text_from_mem(&data)
                    .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
                (text.trim().to_string(), 0)
            }
        };

        if text.is_empty() {
            return Err(PdfError::NoText);
        }

        debug!(
            "extracted {} chars from {} pages ({} empty)",
            text.len(),
            pages_total,
            pages_empty
        );

        Ok(PdfText {
            text,
            pages_total,
            pages_empty,
        })
    }
}

/// Locate the PDF belonging to an XML file.
///
/// Search order: exact stem match (case-insensitive), then any PDF whose
/// name contains the stem prefix (part before the first `-`, else the first
/// ten characters), then any PDF in the folder.
pub fn find_associated_pdf(xml_path: &Path) -> Option<PathBuf> {
    let dir = xml_path.parent()?;
    let stem = xml_path.file_stem()?.to_string_lossy().to_lowercase();

    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    pdfs.sort();

    // Exact stem match.
    if let Some(exact) = pdfs.iter().find(|p| {
        p.file_stem()
            .map(|s| s.to_string_lossy().to_lowercase() == stem)
            .unwrap_or(false)
    }) {
        return Some(exact.clone());
    }

    // Partial match on the stem prefix.
    let prefix: String = match stem.split_once('-') {
        Some((head, _)) => head.to_string(),
        None => stem.chars().take(10).collect(),
    };
    if !prefix.is_empty() {
        if let Some(partial) = pdfs.iter().find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase().contains(&prefix))
                .unwrap_or(false)
        }) {
            return Some(partial.clone());
        }
    }

    // Last resort: any PDF in the folder.
    pdfs.into_iter().next()
}
