use rust_xlsxwriter::{Format, Workbook};

use crate::error::AppError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(value.into())
    }
}

/// A column header and its display width in characters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub header: &'static str,
    pub width: f64,
}

pub const fn column(header: &'static str, width: f64) -> Column {
    Column { header, width }
}

/// One worksheet worth of data, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: &'static str,
    pub columns: &'static [Column],
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Renders the table into an in-memory `.xlsx` workbook with a bold header row.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, AppError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.sheet_name)?;

        for (col, column) in self.columns.iter().enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, column.width)?;
            worksheet.write_string_with_format(0, col, column.header, &header_format)?;
        }

        for (index, cells) in self.rows.iter().enumerate() {
            let row = index as u32 + 1;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => worksheet.write_string(row, col, text)?,
                    Cell::Number(number) => worksheet.write_number(row, col, *number)?,
                };
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}
