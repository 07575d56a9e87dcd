//! Column index -> attribute mapping and the per-column type hints handed to the decoder.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::catalog::RuleCatalog;
use crate::headers::HeaderMatch;

/// A data row keyed by attribute.
pub type NamedRow = Map<String, Value>;

/// How the decoder should materialize the cells of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every non-empty cell becomes a string.
    Text,
    /// Date and date-time cells become Unix epoch seconds.
    Timestamp,
}

/// Column index -> type. Columns without a hint fall back to `default`, or to the decoder's
/// natural typing when there is no default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTypeHints {
    types: BTreeMap<usize, ColumnType>,
    default: Option<ColumnType>,
}

impl ColumnTypeHints {
    /// Every column as text; used to read the header row.
    pub fn all_text() -> Self {
        ColumnTypeHints {
            types: BTreeMap::new(),
            default: Some(ColumnType::Text),
        }
    }

    pub fn set(&mut self, column: usize, column_type: ColumnType) {
        self.types.insert(column, column_type);
    }

    pub fn get(&self, column: usize) -> Option<ColumnType> {
        self.types.get(&column).copied().or(self.default)
    }
}

/// Column index -> attribute key, for matched header columns only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    columns: Vec<(usize, String)>,
}

impl ColumnMap {
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns.iter().map(|(col, attr)| (*col, attr.as_str()))
    }

    pub fn attribute_at(&self, column: usize) -> Option<&str> {
        self.columns
            .iter()
            .find(|(col, _)| *col == column)
            .map(|(_, attr)| attr.as_str())
    }

    pub fn column_of(&self, attribute: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, attr)| attr == attribute)
            .map(|(col, _)| *col)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Name the cells of a raw row. Unmapped columns are dropped; mapped columns the row
    /// is too short to reach are null.
    pub fn to_named_row(&self, row: &[Value]) -> NamedRow {
        let mut named = Map::with_capacity(self.columns.len());
        for (column, attribute) in &self.columns {
            let value = row.get(*column).cloned().unwrap_or(Value::Null);
            named.insert(attribute.clone(), value);
        }
        named
    }
}

pub struct ColumnMapper;

impl ColumnMapper {
    /// Build the column map and type hints for a resolved header row.
    ///
    /// Every header column is read as text unless its attribute carries a timestamp rule.
    pub fn map(headers: &HeaderMatch, catalog: &RuleCatalog) -> (ColumnMap, ColumnTypeHints) {
        let mut hints = ColumnTypeHints::default();
        for column in 0..headers.width() {
            hints.set(column, ColumnType::Text);
        }

        let mut columns = Vec::with_capacity(headers.len());
        for (column, display_name) in headers.iter() {
            let attribute = catalog.attribute_for_header(display_name);
            if catalog.has_timestamp_rule(&attribute) {
                hints.set(column, ColumnType::Timestamp);
            }
            columns.push((column, attribute));
        }

        tracing::debug!(columns = columns.len(), "column map built");

        (ColumnMap { columns }, hints)
    }
}
