//! Spreadsheet input.
//!
//! The first worksheet is read with calamine and every cell is turned into a
//! string, so the rest of the pipeline never sees spreadsheet types.

use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};

use crate::error::ConvertError;

/// Rows of the first worksheet, each cell stringified.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from in-memory rows.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Read the first worksheet of an `.xlsx` workbook.
    pub fn from_xlsx(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
            ConvertError::Spreadsheet(format!("failed to open {}: {e}", path.display()))
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                ConvertError::Spreadsheet(format!("{} has no worksheets", path.display()))
            })?
            .map_err(|e| ConvertError::Spreadsheet(format!("failed to read sheet: {e}")))?;

        // calamine ranges start at the first used cell; pad so row/column
        // positions match the sheet.
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); first_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); first_col as usize];
            cells.extend(row.iter().map(format_cell));
            rows.push(cells);
        }

        tracing::debug!(path = %path.display(), rows = rows.len(), "read worksheet");
        Ok(Self { rows })
    }

    /// Number of rows, including the title and header rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A cell by 0-based position; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Format a cell value as a string
fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Port numbers are stored as floats; drop the trailing `.0`
            let s = f.to_string();
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
