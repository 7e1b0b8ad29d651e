//! Core library for batch invoice reconciliation.
//!
//! This crate provides:
//! - Per-company XML invoice indexing with current-period date filtering
//! - Vehicle-plate extraction from free-text invoice fields
//! - Correos invoice-number and guide-code extraction from associated PDFs
//! - Excel row matching and styled per-company output workbooks
//! - A single-threaded, cooperatively cancellable reconciliation engine

pub mod dates;
pub mod engine;
pub mod error;
pub mod excel;
pub mod extract;
pub mod log;
pub mod models;
pub mod paths;
pub mod pdf;
pub mod report;
pub mod xml;

pub use dates::{parse_excel_date, parse_xml_date, Period};
pub use engine::{CancelToken, OutputFile, ReconciliationEngine, RunOutcome};
pub use error::{ConciliarError, ExcelError, PdfError, Result, XmlError};
pub use extract::{CorreosExtraction, FacturaExtractor, PlacaExtractor, PLACA_UNKNOWN};
pub use log::{LogLevel, LogSink, MemorySink, TracingSink};
pub use models::{CompanyConfig, ProcessingStats, ReconcileConfig, DEFAULT_SPECIAL_VENDOR};
pub use pdf::CorreosPdfProcessor;
pub use report::render_report;
pub use xml::{build_index, CompanyIndex, XmlRecord};
