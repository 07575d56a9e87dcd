//! Construction inputs of a spreadsheet validator.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::catalog::RuleCatalog;
use crate::error::ConfigError;

pub const DEFAULT_FIELD_NAME: &str = "file";
pub const DEFAULT_DATA_ROW_START_INDEX: usize = 2;

/// File-level limits of one upload field. Zero means unbounded for every limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConstraints {
    pub field_name: String,
    pub min_rows: usize,
    pub max_rows: usize,
    /// Kilobytes (KiB).
    pub max_filesize: u64,
    /// 1-based spreadsheet row where data begins; row 1 is always the header.
    pub data_row_start_index: usize,
}

impl FileConstraints {
    pub fn new(
        field_name: &str,
        min_rows: usize,
        max_rows: usize,
        max_filesize: u64,
        data_row_start_index: usize,
    ) -> Result<Self, ConfigError> {
        if data_row_start_index < 2 {
            return Err(ConfigError::DataRowStartIndex(data_row_start_index));
        }
        Ok(FileConstraints {
            field_name: field_name.to_string(),
            min_rows,
            max_rows,
            max_filesize,
            data_row_start_index,
        })
    }
}

impl Default for FileConstraints {
    fn default() -> Self {
        FileConstraints {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            min_rows: 1,
            max_rows: 0,
            max_filesize: 0,
            data_row_start_index: DEFAULT_DATA_ROW_START_INDEX,
        }
    }
}

fn default_field_name() -> String {
    DEFAULT_FIELD_NAME.to_string()
}

fn default_min_rows() -> usize {
    1
}

fn default_data_row_start_index() -> usize {
    DEFAULT_DATA_ROW_START_INDEX
}

/// Everything a validator needs, in a form that can be loaded from JSON.
///
/// ```json
/// {
///   "field_name": "file",
///   "min_rows": 1,
///   "rules": { "email": ["required", "email", "distinct"], "name": "required|max:50" },
///   "attributes": { "name": "Name" },
///   "messages": { "email.distinct": "The :attribute is already used." }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default)]
    pub max_rows: usize,
    #[serde(default)]
    pub max_filesize: u64,
    #[serde(default = "default_data_row_start_index")]
    pub data_row_start_index: usize,
    #[serde(default)]
    pub rules: RuleCatalog,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

impl ValidationConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn constraints(&self) -> Result<FileConstraints, ConfigError> {
        FileConstraints::new(
            &self.field_name,
            self.min_rows,
            self.max_rows,
            self.max_filesize,
            self.data_row_start_index,
        )
    }
}
