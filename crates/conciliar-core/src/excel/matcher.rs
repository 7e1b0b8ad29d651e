//! Row-by-row matching of Excel rows against a company index.

use crate::error::ExcelError;
use crate::xml::CompanyIndex;

use super::reader::ExcelRow;
use super::writer::{OutputWorkbook, RowDetail};

/// Totals for one (Excel file × company) pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub matches: usize,
    pub manual_reviews: usize,
}

/// Match already date-filtered rows against one company's index, writing
/// each hit into `out`.
///
/// Rows whose invoice number is absent from the index are silently dropped;
/// duplicate numbers in the source match independently. A match with more
/// detail lines than `manual_review_limit` gets the manual-review marker
/// instead of the joined text (strictly greater-than).
pub fn match_rows(
    rows: &[ExcelRow],
    index: &CompanyIndex,
    manual_review_limit: usize,
    commercial_activity: &str,
    out: &mut OutputWorkbook,
) -> Result<MatchSummary, ExcelError> {
    let mut summary = MatchSummary::default();

    for row in rows {
        let Some(invoice_number) = row.invoice_number() else {
            continue;
        };
        let Some(detail_lines) = index.get(&invoice_number) else {
            continue;
        };

        if detail_lines.len() > manual_review_limit {
            out.append_row(row, RowDetail::ManualReview, commercial_activity)?;
            summary.manual_reviews += 1;
        } else {
            let joined = detail_lines.join(" | ");
            out.append_row(row, RowDetail::Resolved(&joined), commercial_activity)?;
        }
        summary.matches += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::{read_rows, CellValue};
    use crate::excel::writer::MANUAL_REVIEW_MARKER;
    use pretty_assertions::assert_eq;

    fn row(numero: &str) -> ExcelRow {
        let mut cells = vec![CellValue::Empty; 17];
        cells[1] = CellValue::Text(numero.to_string());
        ExcelRow { cells }
    }

    fn index_with(numero: &str, lines: &[&str]) -> CompanyIndex {
        let mut index = CompanyIndex::new();
        index.insert(
            numero.to_string(),
            lines.iter().map(|s| s.to_string()).collect(),
        );
        index
    }

    #[test]
    fn unmatched_rows_are_silently_dropped() {
        let index = index_with("12345", &["DETALLE"]);
        let rows = vec![row("12345"), row("99999"), row("")];

        let mut out = OutputWorkbook::new().unwrap();
        let summary = match_rows(&rows, &index, 3, "", &mut out).unwrap();

        assert_eq!(summary.matches, 1);
        assert_eq!(out.rows_written(), 1);
    }

    #[test]
    fn manual_review_boundary_is_strictly_greater() {
        let tmp = tempfile::tempdir().unwrap();

        // Exactly at the limit: joined text.
        let index = index_with("12345", &["A", "B", "C"]);
        let mut out = OutputWorkbook::new().unwrap();
        let summary = match_rows(&[row("12345")], &index, 3, "", &mut out).unwrap();
        assert_eq!(summary.manual_reviews, 0);
        let at_limit = tmp.path().join("at_limit.xlsx");
        out.save(&at_limit).unwrap();
        let written = read_rows(&at_limit).unwrap();
        assert_eq!(written[0].cells[5], CellValue::Text("A | B | C".to_string()));

        // One above the limit: marker.
        let index = index_with("12345", &["A", "B", "C", "D"]);
        let mut out = OutputWorkbook::new().unwrap();
        let summary = match_rows(&[row("12345")], &index, 3, "", &mut out).unwrap();
        assert_eq!(summary.manual_reviews, 1);
        assert_eq!(summary.matches, 1);
        let over_limit = tmp.path().join("over_limit.xlsx");
        out.save(&over_limit).unwrap();
        let written = read_rows(&over_limit).unwrap();
        assert_eq!(
            written[0].cells[5],
            CellValue::Text(MANUAL_REVIEW_MARKER.to_string())
        );
    }

    #[test]
    fn duplicate_source_rows_match_independently() {
        let index = index_with("12345", &["DETALLE"]);
        let rows = vec![row("12345"), row("12345")];

        let mut out = OutputWorkbook::new().unwrap();
        let summary = match_rows(&rows, &index, 3, "", &mut out).unwrap();

        assert_eq!(summary.matches, 2);
        assert_eq!(out.rows_written(), 2);
    }
}
