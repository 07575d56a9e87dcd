use calamine::{Data, Range, Reader, Sheets, Xls, Xlsx, open_workbook, open_workbook_auto};
use chrono::DateTime;
use serde_json::{Value, json};
use std::fs::File;
use std::io::BufReader;

use super::{DataRow, RowIterator, Spreadsheet, SpreadsheetDecoder, coerce_value, number_to_text};
use crate::columns::{ColumnType, ColumnTypeHints};
use crate::error::DecodeError;
use crate::upload::UploadedFile;
use crate::utils::{excel_serial_to_epoch, is_blank, parse_datetime_to_epoch};

/// Excel workbooks (xlsx, xls) read with calamine.
///
/// Opening a sheet loads its whole cell range into memory; rows are then handed out one at a
/// time. Only [`CsvDecoder`](super::CsvDecoder) streams from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineDecoder;

impl SpreadsheetDecoder for CalamineDecoder {
    fn open(&self, upload: &UploadedFile) -> Result<Box<dyn Spreadsheet>, DecodeError> {
        let open_error = |message: String| DecodeError::Open {
            path: upload.path.clone(),
            message,
        };

        // Uploads usually sit in extension-less temp files, so the format comes from the client name.
        let workbook: Sheets<BufReader<File>> = match upload.extension().as_deref() {
            Some("xlsx") | Some("xlsm") => Sheets::Xlsx(
                open_workbook::<Xlsx<_>, _>(&upload.path).map_err(|e| open_error(e.to_string()))?,
            ),
            Some("xls") => Sheets::Xls(
                open_workbook::<Xls<_>, _>(&upload.path).map_err(|e| open_error(e.to_string()))?,
            ),
            _ => open_workbook_auto(&upload.path).map_err(|e| open_error(e.to_string()))?,
        };

        Ok(Box::new(CalamineSpreadsheet { workbook }))
    }
}

struct CalamineSpreadsheet {
    workbook: Sheets<BufReader<File>>,
}

impl Spreadsheet for CalamineSpreadsheet {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn open_sheet(
        &mut self,
        name: &str,
        skip_empty_rows: bool,
    ) -> Result<Box<dyn RowIterator>, DecodeError> {
        // TODO: stream xlsx through `worksheet_cells_reader` once the reader can own the workbook.
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| DecodeError::Sheet {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Box::new(CalamineRows {
            range,
            next_row: 0,
            skip_empty_rows,
        }))
    }
}

/// Walks a sheet by absolute row position so that leading blank rows and columns,
/// which calamine trims from the range, still count towards row numbers and column indices.
struct CalamineRows {
    range: Range<Data>,
    next_row: u32,
    skip_empty_rows: bool,
}

impl CalamineRows {
    fn raw_row(&self, row: u32, width: u32) -> Vec<&Data> {
        (0..width)
            .map(|col| self.range.get_value((row, col)).unwrap_or(&Data::Empty))
            .collect()
    }
}

impl RowIterator for CalamineRows {
    fn next_row(&mut self, hints: Option<&ColumnTypeHints>) -> Option<Result<DataRow, DecodeError>> {
        let (last_row, last_col) = self.range.end()?;

        while self.next_row <= last_row {
            let row_index = self.next_row;
            self.next_row += 1;
            let cells = self.raw_row(row_index, last_col + 1);

            let row: DataRow = cells
                .into_iter()
                .enumerate()
                .map(|(col, cell)| materialize(cell, hints.and_then(|h| h.get(col))))
                .collect();

            if self.skip_empty_rows && row.iter().all(is_blank) {
                continue;
            }
            return Some(Ok(row));
        }

        None
    }
}

/// Turn a calamine cell into a JSON value, honoring the column's type hint.
fn materialize(cell: &Data, hint: Option<ColumnType>) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => coerce_value(Value::String(s.clone()), hint),
        Data::Int(i) => coerce_value(json!(*i), hint),
        Data::Float(f) => match hint {
            Some(ColumnType::Text) if f.is_finite() => Value::String(number_to_text(*f)),
            _ => coerce_value(json!(*f), hint),
        },
        Data::Bool(b) => coerce_value(Value::Bool(*b), hint),
        Data::DateTime(dt) => {
            let epoch = excel_serial_to_epoch(dt.as_f64());
            match (hint, epoch) {
                (Some(ColumnType::Timestamp), Some(epoch)) => json!(epoch),
                (_, Some(epoch)) => DateTime::from_timestamp(epoch, 0)
                    .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
                    .unwrap_or(Value::Null),
                (_, None) => Value::String(number_to_text(dt.as_f64())),
            }
        }
        Data::DateTimeIso(s) => match hint {
            Some(ColumnType::Timestamp) => parse_datetime_to_epoch(s)
                .map(|epoch| json!(epoch))
                .unwrap_or_else(|| Value::String(s.clone())),
            _ => Value::String(s.clone()),
        },
        Data::DurationIso(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_text_hint() {
        let hint = Some(ColumnType::Text);
        assert_eq!(materialize(&Data::Int(7), hint), json!("7"));
        assert_eq!(materialize(&Data::Float(12.0), hint), json!("12"));
        assert_eq!(materialize(&Data::Float(1.25), hint), json!("1.25"));
        assert_eq!(materialize(&Data::String("x".into()), hint), json!("x"));
        assert_eq!(materialize(&Data::Empty, hint), Value::Null);
    }

    #[test]
    fn test_materialize_natural_types() {
        assert_eq!(materialize(&Data::Float(12.0), None), json!(12));
        assert_eq!(materialize(&Data::Bool(true), None), json!(true));
        assert_eq!(
            materialize(&Data::DurationIso("PT1H".into()), None),
            json!("PT1H")
        );
    }

    #[test]
    fn test_materialize_iso_datetime_with_timestamp_hint() {
        let cell = Data::DateTimeIso("2023-11-14T22:13:20".into());
        assert_eq!(
            materialize(&cell, Some(ColumnType::Timestamp)),
            json!(1_700_000_000)
        );
        assert_eq!(
            materialize(&cell, Some(ColumnType::Text)),
            json!("2023-11-14T22:13:20")
        );
    }

    #[test]
    fn test_open_garbage_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        let upload = UploadedFile::from_path(&path).unwrap();
        assert!(matches!(
            CalamineDecoder.open(&upload),
            Err(DecodeError::Open { .. })
        ));
    }
}
