//! Error types for the conciliar-core library.

use thiserror::Error;

/// Main error type for the conciliar library.
#[derive(Error, Debug)]
pub enum ConciliarError {
    /// Invoice XML processing error.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Excel workbook error.
    #[error("Excel error: {0}")]
    Excel(#[from] ExcelError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to invoice XML parsing.
#[derive(Error, Debug)]
pub enum XmlError {
    /// The XML document could not be parsed.
    #[error("failed to parse XML: {0}")]
    Parse(String),

    /// The file could not be read.
    #[error("failed to read XML file: {0}")]
    Read(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from the PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// No PDF file was found next to the source XML.
    #[error("no associated PDF found for {0}")]
    NotFound(String),

    /// No text could be extracted from any page.
    #[error("PDF contains no extractable text")]
    NoText,

    /// No invoice number could be extracted from the PDF text.
    #[error("no invoice number found in PDF text")]
    NoInvoiceNumber,

    /// No tracking/guide codes could be extracted from the PDF text.
    #[error("no guide codes found in PDF text")]
    NoGuideCodes,
}

/// Errors related to Excel workbooks.
#[derive(Error, Debug)]
pub enum ExcelError {
    /// Failed to open or read a workbook.
    #[error("failed to read workbook: {0}")]
    Read(String),

    /// The workbook has no usable worksheet.
    #[error("workbook has no worksheet")]
    NoWorksheet,

    /// Failed to write an output workbook.
    #[error("failed to write workbook: {0}")]
    Write(String),
}

/// Result type for the conciliar library.
pub type Result<T> = std::result::Result<T, ConciliarError>;
