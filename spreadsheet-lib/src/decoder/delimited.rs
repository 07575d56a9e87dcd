use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{DataRow, RowIterator, Spreadsheet, SpreadsheetDecoder, coerce_value};
use crate::columns::ColumnTypeHints;
use crate::error::DecodeError;
use crate::upload::UploadedFile;
use crate::utils::is_blank;

/// Comma-separated files, streamed record by record. A CSV file is a single sheet.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDecoder;

impl SpreadsheetDecoder for CsvDecoder {
    fn open(&self, upload: &UploadedFile) -> Result<Box<dyn Spreadsheet>, DecodeError> {
        // Fail early on unreadable files, like a workbook reader would.
        File::open(&upload.path).map_err(|e| DecodeError::Open {
            path: upload.path.clone(),
            message: e.to_string(),
        })?;

        let sheet_name = Path::new(&upload.client_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("Sheet1")
            .to_string();

        Ok(Box::new(CsvSpreadsheet {
            path: upload.path.clone(),
            sheet_name,
        }))
    }
}

struct CsvSpreadsheet {
    path: PathBuf,
    sheet_name: String,
}

impl Spreadsheet for CsvSpreadsheet {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet_name.clone()]
    }

    fn open_sheet(
        &mut self,
        name: &str,
        skip_empty_rows: bool,
    ) -> Result<Box<dyn RowIterator>, DecodeError> {
        if name != self.sheet_name {
            return Err(DecodeError::Sheet {
                sheet: name.to_string(),
                message: "sheet does not exist".to_string(),
            });
        }

        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| DecodeError::Sheet {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Box::new(CsvRows {
            records: reader.into_records(),
            next_line: 1,
            blank_lines: 0,
            pending: None,
            skip_empty_rows,
        }))
    }
}

/// Rows of a CSV file by physical line.
///
/// The csv reader silently drops blank lines, so they are put back as empty rows by comparing
/// each record's starting line with the line the previous record ended on.
struct CsvRows {
    records: StringRecordsIntoIter<File>,
    /// 1-based line the next record is expected to start on.
    next_line: u64,
    /// Blank lines still to be returned before `pending`.
    blank_lines: u64,
    pending: Option<StringRecord>,
    skip_empty_rows: bool,
}

impl RowIterator for CsvRows {
    fn next_row(&mut self, hints: Option<&ColumnTypeHints>) -> Option<Result<DataRow, DecodeError>> {
        loop {
            if self.blank_lines > 0 {
                self.blank_lines -= 1;
                if self.skip_empty_rows {
                    continue;
                }
                return Some(Ok(DataRow::new()));
            }

            let record = match self.pending.take() {
                Some(record) => record,
                None => match self.records.next()? {
                    Ok(record) => record,
                    Err(e) => {
                        return Some(Err(DecodeError::Row {
                            row: self.next_line as usize,
                            message: e.to_string(),
                        }));
                    }
                },
            };

            let start = record
                .position()
                .map(|position| position.line())
                .unwrap_or(self.next_line);
            if start > self.next_line {
                self.blank_lines = start - self.next_line;
                self.next_line = start;
                self.pending = Some(record);
                continue;
            }

            // Quoted fields may span lines; the next record starts after all of them.
            let spanned: u64 = record
                .iter()
                .map(|field| field.matches('\n').count() as u64)
                .sum();
            self.next_line = start + 1 + spanned;

            let row: DataRow = record
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    let value = if field.is_empty() {
                        Value::Null
                    } else {
                        Value::String(field.to_string())
                    };
                    coerce_value(value, hints.and_then(|h| h.get(col)))
                })
                .collect();

            if self.skip_empty_rows && row.iter().all(is_blank) {
                continue;
            }
            return Some(Ok(row));
        }
    }
}
