//! The decoder seam: opening a spreadsheet and pulling its rows one at a time.

mod delimited;
mod excel;

pub use delimited::CsvDecoder;
pub use excel::CalamineDecoder;

use serde_json::{Value, json};

use crate::columns::{ColumnType, ColumnTypeHints};
use crate::error::DecodeError;
use crate::upload::UploadedFile;
use crate::utils::parse_datetime_to_epoch;

/// Raw cell values of one spreadsheet row.
pub type DataRow = Vec<Value>;

pub trait SpreadsheetDecoder {
    fn open(&self, upload: &UploadedFile) -> Result<Box<dyn Spreadsheet>, DecodeError>;
}

/// An opened workbook. Dropping it releases the underlying file.
pub trait Spreadsheet {
    fn sheet_names(&self) -> Vec<String>;

    /// Start reading a sheet from its first row. With `skip_empty_rows`, rows without any
    /// non-empty cell are not returned.
    fn open_sheet(
        &mut self,
        name: &str,
        skip_empty_rows: bool,
    ) -> Result<Box<dyn RowIterator>, DecodeError>;
}

pub trait RowIterator {
    /// Next row, materialized according to `hints`, or `None` once the sheet is exhausted.
    fn next_row(&mut self, hints: Option<&ColumnTypeHints>) -> Option<Result<DataRow, DecodeError>>;
}

/// Picks a decoder from the client file name's extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDecoder;

impl SpreadsheetDecoder for AutoDecoder {
    fn open(&self, upload: &UploadedFile) -> Result<Box<dyn Spreadsheet>, DecodeError> {
        match upload.extension().as_deref() {
            Some("csv") => CsvDecoder.open(upload),
            Some("xlsx") | Some("xlsm") | Some("xls") => CalamineDecoder.open(upload),
            Some(other) => Err(DecodeError::UnsupportedFormat(other.to_string())),
            None => Err(DecodeError::UnsupportedFormat(String::new())),
        }
    }
}

/// Text rendering of a number; integral floats lose their fraction.
pub(crate) fn number_to_text(value: f64) -> String {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// JSON number for a float, preferring an integer when there is no fraction.
pub(crate) fn float_to_json(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Apply a column type hint to a naturally-typed cell value.
pub fn coerce_value(value: Value, hint: Option<ColumnType>) -> Value {
    match (hint, value) {
        (_, Value::Null) => Value::Null,
        (Some(ColumnType::Text), Value::Number(n)) => match n.as_i64() {
            Some(i) => Value::String(i.to_string()),
            None => match n.as_u64() {
                Some(u) => Value::String(u.to_string()),
                None => Value::String(number_to_text(n.as_f64().unwrap_or_default())),
            },
        },
        (Some(ColumnType::Text), Value::Bool(b)) => Value::String(b.to_string()),
        (Some(ColumnType::Timestamp), Value::String(s)) => match parse_datetime_to_epoch(&s) {
            Some(epoch) => json!(epoch),
            None => Value::String(s),
        },
        (_, Value::Number(n)) if n.is_f64() => float_to_json(n.as_f64().unwrap_or_default()),
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_text_hint_renders_strings() {
        assert_eq!(coerce_value(json!(42), Some(ColumnType::Text)), json!("42"));
        assert_eq!(coerce_value(json!(3.0), Some(ColumnType::Text)), json!("3"));
        assert_eq!(coerce_value(json!(2.5), Some(ColumnType::Text)), json!("2.5"));
        assert_eq!(
            coerce_value(json!(true), Some(ColumnType::Text)),
            json!("true")
        );
        assert_eq!(coerce_value(Value::Null, Some(ColumnType::Text)), Value::Null);
    }

    #[test]
    fn test_coerce_timestamp_hint_converts_dates() {
        assert_eq!(
            coerce_value(json!("1970-01-02"), Some(ColumnType::Timestamp)),
            json!(86_400)
        );
        assert_eq!(
            coerce_value(json!("1700000000"), Some(ColumnType::Timestamp)),
            json!("1700000000")
        );
        assert_eq!(
            coerce_value(json!(1_700_000_000.0), Some(ColumnType::Timestamp)),
            json!(1_700_000_000)
        );
    }

    #[test]
    fn test_coerce_without_hint_keeps_natural_type() {
        assert_eq!(coerce_value(json!("abc"), None), json!("abc"));
        assert_eq!(coerce_value(json!(7.0), None), json!(7));
        assert_eq!(coerce_value(json!(false), None), json!(false));
    }

    #[test]
    fn test_auto_decoder_rejects_unknown_extensions() {
        let upload = UploadedFile::new("/tmp/whatever", "notes.txt", 0);
        let result = AutoDecoder.open(&upload);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
