//! Aggregate statistics for one reconciliation run.
//!
//! Owned by the engine, mutated throughout a single run, read-only for the
//! caller afterwards (summary report, audit lists, log output).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An XML record excluded because its issue date fell outside the period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedXml {
    pub company: String,
    pub invoice_number: String,
    pub raw_date: String,
    pub parsed_date: String,
}

/// An Excel row excluded because its document date fell outside the period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedRow {
    pub filename: String,
    pub invoice_number: String,
    pub raw_date: String,
    pub parsed_date: String,
}

/// Per-company breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyDetail {
    pub name: String,
    pub folder_exists: bool,
    pub dynamic_path: String,
    pub xml_count: usize,
    pub xml_valid: usize,
    pub xml_current_month: usize,
    pub xml_excluded_by_date: usize,
    pub xml_errors: usize,
    pub matches: usize,
    pub manual_reviews: usize,
    pub correos_processed: usize,
    pub placas_extracted: usize,
    pub combustible_exclusions: usize,
    pub excel_rows_processed: usize,
}

/// Counters and audit lists accumulated across one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    // Companies
    pub companies_processed: usize,
    pub companies_with_matches: usize,
    pub companies_without_matches: usize,
    pub companies_no_matches: Vec<String>,

    // Dynamic folders
    pub companies_folders_found: usize,
    pub companies_folders_missing: usize,
    pub companies_folders_skipped: Vec<String>,

    // XML date filtering
    pub total_xml_count: usize,
    pub total_xml_valid: usize,
    pub total_xml_current_month: usize,
    pub total_xml_excluded_by_date: usize,
    pub excluded_by_date: Vec<ExcludedXml>,

    // Excel date filtering
    pub excel_rows_total: usize,
    pub excel_rows_current_month: usize,
    pub excel_rows_excluded_by_date: usize,
    pub excel_excluded_by_date: Vec<ExcludedRow>,

    // Correos PDFs
    pub correos_pdfs_processed: usize,
    pub correos_pdfs_failed: usize,
    pub correos_matches: usize,

    // Plate extraction
    pub otro_texto_processed: usize,
    pub placas_extracted: usize,
    pub placas_failed: usize,
    pub fallback_to_detalle: usize,
    pub placa_extraction_rate: f64,
    pub combustible_exclusions_applied: usize,

    // Matching
    pub excel_processed: usize,
    pub total_matches: usize,
    pub total_manual_reviews: usize,
    pub files_created: usize,
    pub processing_time_secs: f64,

    pub company_details: BTreeMap<String, CompanyDetail>,
}

impl ProcessingStats {
    /// Derived rates computed once a run finishes.
    pub fn finalize(&mut self) {
        if self.otro_texto_processed > 0 {
            self.placa_extraction_rate =
                self.placas_extracted as f64 / self.otro_texto_processed as f64 * 100.0;
        }
    }

    /// Mutable access to a company's breakdown, creating it on first use.
    pub fn company_mut(&mut self, key: &str) -> &mut CompanyDetail {
        self.company_details.entry(key.to_string()).or_default()
    }
}
