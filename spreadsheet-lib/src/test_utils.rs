// Test utilities available to both unit and integration tests
// Only compiled when testing or with the `test` feature

use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::Path;

use crate::catalog::RuleCatalog;
use crate::columns::ColumnTypeHints;
use crate::decoder::{DataRow, RowIterator, Spreadsheet, SpreadsheetDecoder, coerce_value};
use crate::error::DecodeError;
use crate::upload::UploadedFile;
use crate::utils::is_blank;

/// Rows held in memory, materialized with the hints passed to each call.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    rows: VecDeque<DataRow>,
    yielded: usize,
    fail_at: Option<usize>,
    skip_empty_rows: bool,
}

impl MemoryRows {
    pub fn new(rows: Vec<DataRow>) -> Self {
        MemoryRows {
            rows: rows.into(),
            ..MemoryRows::default()
        }
    }

    /// Return a decode error once `count` rows have been yielded.
    pub fn fail_at(mut self, count: usize) -> Self {
        self.fail_at = Some(count);
        self
    }

    pub fn skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }
}

impl RowIterator for MemoryRows {
    fn next_row(&mut self, hints: Option<&ColumnTypeHints>) -> Option<Result<DataRow, DecodeError>> {
        if self.fail_at == Some(self.yielded) {
            self.fail_at = None;
            self.rows.clear();
            return Some(Err(DecodeError::Row {
                row: self.yielded + 1,
                message: "simulated read failure".to_string(),
            }));
        }

        loop {
            let row = self.rows.pop_front()?;
            if self.skip_empty_rows && row.iter().all(is_blank) {
                continue;
            }
            self.yielded += 1;
            let row = row
                .into_iter()
                .enumerate()
                .map(|(column, value)| coerce_value(value, hints.and_then(|h| h.get(column))))
                .collect();
            return Some(Ok(row));
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemorySpreadsheet {
    sheets: Vec<(String, Vec<DataRow>)>,
    fail_at: Option<usize>,
}

impl Spreadsheet for MemorySpreadsheet {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn open_sheet(
        &mut self,
        name: &str,
        skip_empty_rows: bool,
    ) -> Result<Box<dyn RowIterator>, DecodeError> {
        let (_, rows) = self
            .sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .ok_or_else(|| DecodeError::Sheet {
                sheet: name.to_string(),
                message: "no such sheet".to_string(),
            })?;
        let mut iterator = MemoryRows::new(rows.clone()).skip_empty_rows(skip_empty_rows);
        if let Some(count) = self.fail_at {
            iterator = iterator.fail_at(count);
        }
        Ok(Box::new(iterator))
    }
}

/// A decoder that ignores the file contents and serves fixed sheets.
#[derive(Debug, Clone, Default)]
pub struct MemoryDecoder {
    sheets: Vec<(String, Vec<DataRow>)>,
    fail_open: bool,
    fail_at: Option<usize>,
}

impl MemoryDecoder {
    /// One sheet whose first row is the header.
    pub fn single(rows: Vec<DataRow>) -> Self {
        MemoryDecoder {
            sheets: vec![("Sheet1".to_string(), rows)],
            ..MemoryDecoder::default()
        }
    }

    pub fn sheets(sheets: Vec<(&str, Vec<DataRow>)>) -> Self {
        MemoryDecoder {
            sheets: sheets
                .into_iter()
                .map(|(name, rows)| (name.to_string(), rows))
                .collect(),
            ..MemoryDecoder::default()
        }
    }

    /// A decoder that cannot open anything.
    pub fn unreadable() -> Self {
        MemoryDecoder {
            fail_open: true,
            ..MemoryDecoder::default()
        }
    }

    /// Fail after `count` rows (header included) have been read.
    pub fn fail_at(mut self, count: usize) -> Self {
        self.fail_at = Some(count);
        self
    }
}

impl SpreadsheetDecoder for MemoryDecoder {
    fn open(&self, upload: &UploadedFile) -> Result<Box<dyn Spreadsheet>, DecodeError> {
        if self.fail_open {
            return Err(DecodeError::Open {
                path: upload.path.clone(),
                message: "simulated corrupt file".to_string(),
            });
        }
        Ok(Box::new(MemorySpreadsheet {
            sheets: self.sheets.clone(),
            fail_at: self.fail_at,
        }))
    }
}

/// Build rows from string literals; `""` becomes an empty cell.
pub fn text_rows(rows: &[&[&str]]) -> Vec<DataRow> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| if cell.is_empty() { Value::Null } else { json!(cell) })
                .collect()
        })
        .collect()
}

/// Write `contents` to `dir/name` and describe it as an upload with that client name.
pub fn write_upload(dir: &Path, name: &str, contents: &[u8]) -> UploadedFile {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    UploadedFile::new(path, name, contents.len() as u64)
}

/// Catalog used across tests: a distinct email, a required name shown as "Full Name" and a
/// timestamp column.
pub fn sample_catalog() -> RuleCatalog {
    RuleCatalog::new()
        .attribute("email", ["required", "email", "distinct"])
        .attribute("name", ["required", "string", "max:50"])
        .attribute("signup", ["nullable", "unix_timestamp"])
        .display_name("name", "Full Name")
}
