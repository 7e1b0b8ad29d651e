//! Plain-text run report.
//!
//! Rendered from [`ProcessingStats`] after a run; the CLI prints it on
//! request and external tooling can feed it into the outgoing summary mail.

use std::fmt::Write;

use crate::dates::Period;
use crate::models::ProcessingStats;

/// How many excluded records each audit section lists before truncating.
const MAX_LISTED_EXCLUSIONS: usize = 10;

/// Render the detailed run report.
pub fn render_report(stats: &ProcessingStats, period: Period) -> String {
    let mut out = String::new();

    let time = if stats.processing_time_secs > 60.0 {
        format!("{:.1} min", stats.processing_time_secs / 60.0)
    } else {
        format!("{:.1} s", stats.processing_time_secs)
    };

    let _ = writeln!(out, "RECONCILIATION REPORT — period {period}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Companies");
    let _ = writeln!(out, "  configured:        {}", stats.companies_processed);
    let _ = writeln!(out, "  folders found:     {}", stats.companies_folders_found);
    let _ = writeln!(out, "  folders missing:   {}", stats.companies_folders_missing);
    let _ = writeln!(out, "  with matches:      {}", stats.companies_with_matches);
    let _ = writeln!(out, "  without matches:   {}", stats.companies_without_matches);
    let _ = writeln!(out);

    let _ = writeln!(out, "XML date filtering");
    let _ = writeln!(out, "  found:             {}", stats.total_xml_count);
    let _ = writeln!(out, "  valid:             {}", stats.total_xml_valid);
    let _ = writeln!(out, "  in period:         {}", stats.total_xml_current_month);
    let _ = writeln!(out, "  excluded by date:  {}", stats.total_xml_excluded_by_date);
    let _ = writeln!(out);

    let _ = writeln!(out, "Excel date filtering");
    let _ = writeln!(out, "  rows found:        {}", stats.excel_rows_total);
    let _ = writeln!(out, "  rows in period:    {}", stats.excel_rows_current_month);
    let _ = writeln!(out, "  excluded by date:  {}", stats.excel_rows_excluded_by_date);
    let _ = writeln!(out);

    let _ = writeln!(out, "Correos PDFs");
    let _ = writeln!(out, "  processed:         {}", stats.correos_pdfs_processed);
    let _ = writeln!(out, "  failed:            {}", stats.correos_pdfs_failed);
    let _ = writeln!(out, "  matches:           {}", stats.correos_matches);
    let _ = writeln!(out);

    let _ = writeln!(out, "Plate extraction");
    let _ = writeln!(out, "  free-text fields:  {}", stats.otro_texto_processed);
    let _ = writeln!(out, "  plates extracted:  {}", stats.placas_extracted);
    let _ = writeln!(out, "  failed:            {}", stats.placas_failed);
    let _ = writeln!(out, "  detail fallbacks:  {}", stats.fallback_to_detalle);
    let _ = writeln!(out, "  exclusions:        {}", stats.combustible_exclusions_applied);
    let _ = writeln!(out, "  extraction rate:   {:.1}%", stats.placa_extraction_rate);
    let _ = writeln!(out);

    let _ = writeln!(out, "Results");
    let _ = writeln!(out, "  Excel processed:   {}", stats.excel_processed);
    let _ = writeln!(out, "  matches:           {}", stats.total_matches);
    let _ = writeln!(out, "  manual reviews:    {}", stats.total_manual_reviews);
    let _ = writeln!(out, "  files created:     {}", stats.files_created);
    let _ = writeln!(out, "  total time:        {time}");

    if !stats.company_details.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Per company");
        for detail in stats.company_details.values() {
            let folder = if detail.folder_exists { "" } else { " [no folder]" };
            let mut extras = Vec::new();
            if detail.correos_processed > 0 {
                extras.push(format!("{} Correos", detail.correos_processed));
            }
            if detail.placas_extracted > 0 {
                extras.push(format!("{} plates", detail.placas_extracted));
            }
            if detail.combustible_exclusions > 0 {
                extras.push(format!("{} fuel exclusions", detail.combustible_exclusions));
            }
            let extras = if extras.is_empty() {
                String::new()
            } else {
                format!(", {}", extras.join(", "))
            };
            let _ = writeln!(
                out,
                "  {}{folder}: {} matches ({} XMLs in period, {} excluded{extras})",
                detail.name, detail.matches, detail.xml_current_month, detail.xml_excluded_by_date
            );
        }
    }

    if !stats.companies_folders_skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Companies skipped (no {period} folder)");
        for name in &stats.companies_folders_skipped {
            let _ = writeln!(out, "  - {name}");
        }
    }

    if !stats.companies_no_matches.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Companies without matches");
        for name in &stats.companies_no_matches {
            let _ = writeln!(out, "  - {name}");
        }
    }

    if !stats.excluded_by_date.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "XMLs excluded by date ({} total)",
            stats.excluded_by_date.len()
        );
        for excluded in stats.excluded_by_date.iter().take(MAX_LISTED_EXCLUSIONS) {
            let _ = writeln!(
                out,
                "  - {} ({}) - {}",
                excluded.invoice_number, excluded.company, excluded.parsed_date
            );
        }
        if stats.excluded_by_date.len() > MAX_LISTED_EXCLUSIONS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                stats.excluded_by_date.len() - MAX_LISTED_EXCLUSIONS
            );
        }
    }

    if !stats.excel_excluded_by_date.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Excel rows excluded by date ({} total)",
            stats.excel_excluded_by_date.len()
        );
        for excluded in stats.excel_excluded_by_date.iter().take(MAX_LISTED_EXCLUSIONS) {
            let _ = writeln!(
                out,
                "  - {} ({}) - {}",
                excluded.invoice_number, excluded.filename, excluded.parsed_date
            );
        }
        if stats.excel_excluded_by_date.len() > MAX_LISTED_EXCLUSIONS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                stats.excel_excluded_by_date.len() - MAX_LISTED_EXCLUSIONS
            );
        }
    }

    out
}
