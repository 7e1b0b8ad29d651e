//! Styled output workbook writing.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use crate::error::ExcelError;

use super::reader::{CellValue, ExcelRow};

/// Output column headers; the source's 17 columns plus the commercial
/// activity appended per company.
pub const OUTPUT_COLUMNS: [&str; 18] = [
    "Proveedor",
    "Numero",
    "Tipo de Documento",
    "Fecha Documento",
    "Fecha Rige",
    "Aplicación",
    "Monto",
    "Subtotal",
    "Impuesto1",
    "Tipo de Cambio",
    "Notas",
    "Condicion de Pago",
    "Moneda",
    "Subtipo Documento",
    "Fecha Vence",
    "Tipo Asiento",
    "Paquete",
    "Actividad Comercial",
];

/// Marker written instead of detail text when a match is ambiguous.
pub const MANUAL_REVIEW_MARKER: &str = "Revision Manual";

/// 0-based index of the detail column ("Aplicación").
const DETAIL_COLUMN: usize = 5;

/// 0-based index of the commercial-activity column.
const ACTIVITY_COLUMN: usize = 17;

/// What goes into the detail column of one output row.
pub enum RowDetail<'a> {
    Resolved(&'a str),
    ManualReview,
}

/// One per-(Excel file × company) output workbook under construction.
pub struct OutputWorkbook {
    workbook: Workbook,
    next_row: u32,
    review_format: Format,
}

impl OutputWorkbook {
    pub fn new() -> Result<Self, ExcelError> {
        let mut workbook = Workbook::new();

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x366092))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        let review_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0xFF0000));

        let worksheet = workbook.add_worksheet();
        for (col, header) in OUTPUT_COLUMNS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(|e| ExcelError::Write(e.to_string()))?;
        }

        Ok(Self {
            workbook,
            next_row: 1,
            review_format,
        })
    }

    /// Append one matched row: the source cells with the detail column
    /// replaced and the commercial activity appended.
    pub fn append_row(
        &mut self,
        source: &ExcelRow,
        detail: RowDetail<'_>,
        commercial_activity: &str,
    ) -> Result<(), ExcelError> {
        let row = self.next_row;
        let worksheet = self
            .workbook
            .worksheet_from_index(0)
            .map_err(|e| ExcelError::Write(e.to_string()))?;

        for col in 0..ACTIVITY_COLUMN {
            if col == DETAIL_COLUMN {
                match detail {
                    RowDetail::Resolved(text) => {
                        worksheet
                            .write_string(row, col as u16, text)
                            .map_err(|e| ExcelError::Write(e.to_string()))?;
                    }
                    RowDetail::ManualReview => {
                        worksheet
                            .write_string_with_format(
                                row,
                                col as u16,
                                MANUAL_REVIEW_MARKER,
                                &self.review_format,
                            )
                            .map_err(|e| ExcelError::Write(e.to_string()))?;
                    }
                }
                continue;
            }

            match source.cells.get(col).unwrap_or(&CellValue::Empty) {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet
                        .write_string(row, col as u16, s)
                        .map_err(|e| ExcelError::Write(e.to_string()))?;
                }
                CellValue::Number(n) => {
                    worksheet
                        .write_number(row, col as u16, *n)
                        .map_err(|e| ExcelError::Write(e.to_string()))?;
                }
                CellValue::Bool(b) => {
                    worksheet
                        .write_boolean(row, col as u16, *b)
                        .map_err(|e| ExcelError::Write(e.to_string()))?;
                }
            }
        }

        worksheet
            .write_string(row, ACTIVITY_COLUMN as u16, commercial_activity)
            .map_err(|e| ExcelError::Write(e.to_string()))?;

        self.next_row += 1;
        Ok(())
    }

    /// Rows written so far, header excluded.
    pub fn rows_written(&self) -> u32 {
        self.next_row - 1
    }

    /// Fit columns and save to disk.
    pub fn save(mut self, path: &Path) -> Result<(), ExcelError> {
        let worksheet = self
            .workbook
            .worksheet_from_index(0)
            .map_err(|e| ExcelError::Write(e.to_string()))?;
        worksheet.autofit();

        self.workbook
            .save(path)
            .map_err(|e| ExcelError::Write(e.to_string()))
    }
}
