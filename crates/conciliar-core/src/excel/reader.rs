//! Excel input loading and date filtering.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};

use crate::dates::{parse_excel_date, Period};
use crate::error::ExcelError;
use crate::log::{LogLevel, LogSink};
use crate::models::{ExcludedRow, ProcessingStats};

/// 0-based column carrying the invoice number.
pub const INVOICE_NUMBER_COLUMN: usize = 1;

/// 0-based column carrying the `dd-mm-yyyy` document date.
pub const DOCUMENT_DATE_COLUMN: usize = 3;

/// A cell value preserved for passthrough into the output workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(_) => CellValue::Empty,
            // Dates and durations pass through as their display text.
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Render the cell as a lookup key (integers without a trailing `.0`).
    pub fn as_key(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

/// One source row, immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcelRow {
    pub cells: Vec<CellValue>,
}

impl ExcelRow {
    /// Invoice number from column 2, if non-empty.
    pub fn invoice_number(&self) -> Option<String> {
        let key = self.cells.get(INVOICE_NUMBER_COLUMN)?.as_key();
        (!key.is_empty()).then_some(key)
    }

    /// Raw document date text from column 4.
    pub fn document_date_text(&self) -> Option<String> {
        let text = self.cells.get(DOCUMENT_DATE_COLUMN)?.as_key();
        (!text.is_empty()).then_some(text)
    }
}

/// Load all data rows (header skipped) from the first worksheet.
pub fn read_rows(path: &Path) -> Result<Vec<ExcelRow>, ExcelError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: XlsxError| ExcelError::Read(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ExcelError::NoWorksheet)?
        .map_err(|e| ExcelError::Read(e.to_string()))?;

    Ok(range
        .rows()
        .skip(1)
        .map(|row| ExcelRow {
            cells: row.iter().map(CellValue::from_data).collect(),
        })
        .collect())
}

/// Keep only rows whose document date falls in the period.
///
/// Rows with a missing or unparsable date are kept with a warning; only a
/// successfully parsed out-of-period date excludes a row. Rows too short to
/// carry a date column are dropped.
pub fn filter_rows_by_date(
    rows: Vec<ExcelRow>,
    period: Period,
    filename: &str,
    stats: &mut ProcessingStats,
    sink: &dyn LogSink,
) -> Vec<ExcelRow> {
    let total = rows.len();
    let mut kept = Vec::with_capacity(total);
    let mut excluded = 0usize;

    for (i, row) in rows.into_iter().enumerate() {
        if row.cells.len() <= DOCUMENT_DATE_COLUMN {
            continue;
        }

        let Some(date_text) = row.document_date_text() else {
            sink.log(
                LogLevel::Warning,
                &format!("{filename}: row {} has no document date", i + 1),
            );
            kept.push(row);
            continue;
        };

        match parse_excel_date(&date_text) {
            None => {
                sink.log(
                    LogLevel::Warning,
                    &format!("{filename}: invalid date '{date_text}' in row {}", i + 1),
                );
                kept.push(row);
            }
            Some(date) if !period.contains(date) => {
                excluded += 1;
                stats.excel_rows_excluded_by_date += 1;
                stats.excel_excluded_by_date.push(ExcludedRow {
                    filename: filename.to_string(),
                    invoice_number: row.invoice_number().unwrap_or_else(|| "N/A".to_string()),
                    raw_date: date_text,
                    parsed_date: date.format("%d-%m-%Y").to_string(),
                });
            }
            Some(_) => kept.push(row),
        }
    }

    stats.excel_rows_total += total;
    stats.excel_rows_current_month += kept.len();

    if excluded > 0 {
        sink.log(
            LogLevel::Info,
            &format!(
                "{filename}: {} rows in period, {excluded} excluded by date",
                kept.len()
            ),
        );
    } else {
        sink.log(
            LogLevel::Info,
            &format!("{filename}: {} usable rows", kept.len()),
        );
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn row(cells: Vec<CellValue>) -> ExcelRow {
        ExcelRow { cells }
    }

    fn seventeen(numero: &str, fecha: &str) -> ExcelRow {
        let mut cells = vec![CellValue::Empty; 17];
        cells[0] = CellValue::Text("Proveedor X".to_string());
        cells[INVOICE_NUMBER_COLUMN] = CellValue::Text(numero.to_string());
        cells[DOCUMENT_DATE_COLUMN] = CellValue::Text(fecha.to_string());
        row(cells)
    }

    #[test]
    fn numeric_invoice_number_has_no_decimal_tail() {
        let mut cells = vec![CellValue::Empty; 17];
        cells[INVOICE_NUMBER_COLUMN] = CellValue::Number(12345.0);
        assert_eq!(row(cells).invoice_number(), Some("12345".to_string()));
    }

    #[test]
    fn filter_keeps_current_period_rows() {
        let period = Period::of(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        let rows = vec![
            seventeen("111", "01-07-2025"),
            seventeen("222", "30-06-2025"),
            seventeen("333", "15/07/2025"),
        ];

        let mut stats = ProcessingStats::default();
        let sink = MemorySink::new();
        let kept = filter_rows_by_date(rows, period, "cargador.xlsx", &mut stats, &sink);

        assert_eq!(kept.len(), 2);
        assert_eq!(stats.excel_rows_total, 3);
        assert_eq!(stats.excel_rows_current_month, 2);
        assert_eq!(stats.excel_rows_excluded_by_date, 1);
        assert_eq!(stats.excel_excluded_by_date[0].invoice_number, "222");
    }

    #[test]
    fn unparsable_date_is_kept_with_warning() {
        let period = Period::of(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        let rows = vec![seventeen("111", "sin fecha")];

        let mut stats = ProcessingStats::default();
        let sink = MemorySink::new();
        let kept = filter_rows_by_date(rows, period, "cargador.xlsx", &mut stats, &sink);

        assert_eq!(kept.len(), 1);
        let warned = sink
            .take()
            .iter()
            .any(|(level, msg)| *level == LogLevel::Warning && msg.contains("invalid date"));
        assert!(warned);
    }

    #[test]
    fn short_rows_are_dropped() {
        let period = Period::of(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        let rows = vec![row(vec![CellValue::Text("solo".to_string())])];

        let mut stats = ProcessingStats::default();
        let sink = MemorySink::new();
        let kept = filter_rows_by_date(rows, period, "cargador.xlsx", &mut stats, &sink);

        assert!(kept.is_empty());
    }
}
