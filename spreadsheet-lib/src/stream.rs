//! Data rows of a sheet as attribute-keyed records.

use crate::columns::{ColumnMap, ColumnTypeHints, NamedRow};
use crate::decoder::RowIterator;
use crate::error::DecodeError;
use crate::utils::is_blank;

/// Pulls data rows from a decoder that has already yielded the header row.
///
/// Rows before the data start index are read past without being converted. The first row whose
/// cells are all empty ends the stream; nothing after it is read.
pub struct RowStream<'a> {
    rows: Box<dyn RowIterator>,
    column_map: &'a ColumnMap,
    hints: &'a ColumnTypeHints,
    data_row_start_index: usize,
    next_row_number: usize,
    finished: bool,
}

impl<'a> RowStream<'a> {
    pub fn new(
        rows: Box<dyn RowIterator>,
        column_map: &'a ColumnMap,
        hints: &'a ColumnTypeHints,
        data_row_start_index: usize,
    ) -> Self {
        RowStream {
            rows,
            column_map,
            hints,
            data_row_start_index,
            next_row_number: 2,
            finished: false,
        }
    }

    /// Spreadsheet row number the next decoded row will have.
    pub fn next_row_number(&self) -> usize {
        self.next_row_number
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<NamedRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let row = match self.rows.next_row(Some(self.hints)) {
                Some(Ok(row)) => row,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            };

            let row_number = self.next_row_number;
            self.next_row_number += 1;

            if row_number < self.data_row_start_index {
                continue;
            }

            if row.iter().all(is_blank) {
                tracing::debug!(row = row_number, "empty row reached, end of data");
                self.finished = true;
                return None;
            }

            return Some(Ok(self.column_map.to_named_row(&row)));
        }
    }
}
