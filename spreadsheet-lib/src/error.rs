use std::path::PathBuf;
use thiserror::Error;

use crate::report::ErrorReport;

/// Errors raised while assembling a validator, before any file is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("dataRowStartIndex cannot be less than 2 (got {0})")]
    DataRowStartIndex(usize),

    #[error("rule '{rule}' on attribute '{attribute}' is invalid: {reason}")]
    InvalidRule {
        attribute: String,
        rule: String,
        reason: String,
    },

    #[error("invalid JSON schema for attribute '{attribute}': {message}")]
    InvalidSchema { attribute: String, message: String },

    #[error("invalid rule catalog: {0}")]
    Catalog(String),

    #[error("invalid validation config: {0}")]
    Parse(String),
}

/// Errors surfaced by a spreadsheet decoder.
///
/// These never leave the validator as such: any of them is reported as the
/// `unresolvable` failure against the uploaded file.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to open spreadsheet {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("unsupported spreadsheet format '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },

    #[error("failed to read row {row}: {message}")]
    Row { row: usize, message: String },
}

/// Returned by `validated()` when the pass did not succeed.
#[derive(Error, Debug, Clone)]
#[error("The given data was invalid: {}", .report.first_message().unwrap_or("unknown error"))]
pub struct ValidationFailure {
    pub report: ErrorReport,
}

impl ValidationFailure {
    pub fn new(report: ErrorReport) -> Self {
        ValidationFailure { report }
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::DataRowStartIndex(1);
        assert_eq!(
            err.to_string(),
            "dataRowStartIndex cannot be less than 2 (got 1)"
        );
    }

    #[test]
    fn test_validation_failure_display_uses_first_message() {
        let mut report = ErrorReport::default();
        report.add("email", "The email @ A2 field is required.");
        let failure = ValidationFailure::new(report);
        assert_eq!(
            failure.to_string(),
            "The given data was invalid: The email @ A2 field is required."
        );
    }
}
