//! Excel input reading, matching, and styled output writing.

pub mod matcher;
pub mod reader;
pub mod writer;

pub use matcher::{match_rows, MatchSummary};
pub use reader::{filter_rows_by_date, read_rows, CellValue, ExcelRow};
pub use writer::{OutputWorkbook, RowDetail, MANUAL_REVIEW_MARKER, OUTPUT_COLUMNS};
