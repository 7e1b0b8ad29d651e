//! Date parsing and current-period filtering.
//!
//! Two literal layouts are accepted, depending on the source: invoice XMLs
//! carry ISO-like timestamps (`2025-07-01T10:19:14-06:00`), Excel rows carry
//! `dd-mm-yyyy` or `dd/mm/yyyy` document dates. Parsing never fails hard:
//! a bad date yields `None` and the caller decides the inclusion policy.

use chrono::{Datelike, NaiveDate};

/// The calendar month/year a reconciliation run is scoped to.
///
/// Captured once at the start of a run so a run straddling a month boundary
/// filters every record against the same period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// True when `date` falls in this month and year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// Parse an XML issue date (`FechaEmision`).
///
/// Typical input is `2025-07-01T10:19:14-06:00`; only the date part is used
/// and the timezone is ignored. A bare `YYYY-MM-DD` prefix also parses.
pub fn parse_xml_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let date_part = match text.split_once('T') {
        Some((date, _)) => date,
        None => text.get(..10)?,
    };

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse an Excel document date (`Fecha Documento` column).
///
/// Expected layouts: `27-06-2024` or `27/06/2024`, exactly ten characters.
pub fn parse_excel_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() != 10 {
        return None;
    }

    if text.matches('-').count() == 2 {
        NaiveDate::parse_from_str(text, "%d-%m-%Y").ok()
    } else if text.matches('/').count() == 2 {
        NaiveDate::parse_from_str(text, "%d/%m/%Y").ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_timestamp_with_offset() {
        assert_eq!(
            parse_xml_date("2025-07-01T10:19:14-06:00"),
            Some(date(2025, 7, 1))
        );
    }

    #[test]
    fn parses_bare_iso_date() {
        assert_eq!(parse_xml_date("2025-07-01"), Some(date(2025, 7, 1)));
    }

    #[test]
    fn rejects_malformed_xml_date() {
        assert_eq!(parse_xml_date("not-a-date"), None);
        assert_eq!(parse_xml_date(""), None);
        assert_eq!(parse_xml_date("2025-13-40T00:00:00"), None);
    }

    #[test]
    fn parses_excel_date_both_separators() {
        assert_eq!(parse_excel_date("27-06-2024"), Some(date(2024, 6, 27)));
        assert_eq!(parse_excel_date("27/06/2024"), Some(date(2024, 6, 27)));
    }

    #[test]
    fn rejects_malformed_excel_date() {
        assert_eq!(parse_excel_date("2024-06-27"), None); // wrong order
        assert_eq!(parse_excel_date("27-06-24"), None); // wrong length
        assert_eq!(parse_excel_date("27.06.2024"), None);
    }

    #[test]
    fn period_round_trip() {
        let reference = date(2025, 7, 15);
        let period = Period::of(reference);

        let formatted = reference.format("%d-%m-%Y").to_string();
        assert!(period.contains(parse_excel_date(&formatted).unwrap()));

        assert!(period.contains(date(2025, 7, 1)));
        assert!(period.contains(date(2025, 7, 31)));
        assert!(!period.contains(date(2025, 6, 30)));
        assert!(!period.contains(date(2024, 7, 15)));
    }
}
