//! Header row resolution: which required headers are present, and where.

use serde_json::Value;

use crate::catalog::RuleCatalog;
use crate::rules::{DISTINCT_HEADER, MISSING_HEADER};
use crate::utils::{is_blank, normalize_header, value_to_text};

/// Spreadsheet column letters for a 0-based column index: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let remainder = (n - 1) % 26;
        letters.push(b'A' + remainder as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Cell reference such as `C5`.
pub fn cell_reference(column: usize, row: usize) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Required headers found in the header row: column index -> display name, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMatch {
    columns: Vec<(usize, String)>,
    width: usize,
}

impl HeaderMatch {
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns.iter().map(|(col, name)| (*col, name.as_str()))
    }

    pub fn column_of(&self, display_name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, name)| name == display_name)
            .map(|(col, _)| *col)
    }

    /// Number of cells in the header row, matched or not.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Why a header row was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderFailure {
    /// Required display names absent from the header row.
    Missing(Vec<String>),
    /// Every occurrence of a required display name that appears in more than one column.
    Duplicate(Vec<(String, usize)>),
}

impl HeaderFailure {
    pub fn code(&self) -> &'static str {
        match self {
            HeaderFailure::Missing(_) => MISSING_HEADER,
            HeaderFailure::Duplicate(_) => DISTINCT_HEADER,
        }
    }

    /// Value of the `:headers` placeholder.
    pub fn headers_parameter(&self) -> String {
        match self {
            HeaderFailure::Missing(names) => names.join(", "),
            HeaderFailure::Duplicate(occurrences) => occurrences
                .iter()
                .map(|(name, col)| format!("{} @ {}", name, cell_reference(*col, 1)))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

pub struct HeaderResolver {
    required: Vec<String>,
}

impl HeaderResolver {
    pub fn new(catalog: &RuleCatalog) -> Self {
        HeaderResolver {
            required: catalog.required_headers(),
        }
    }

    pub fn required_headers(&self) -> &[String] {
        &self.required
    }

    /// Match the header row against the required headers.
    ///
    /// Duplicates are checked before omissions; an absent or blank header row misses every header.
    pub fn resolve(&self, header_row: Option<&[Value]>) -> Result<HeaderMatch, HeaderFailure> {
        let cells = match header_row {
            Some(cells) if !cells.iter().all(is_blank) => cells,
            _ => return Err(HeaderFailure::Missing(self.required.clone())),
        };

        let mut columns: Vec<(usize, String)> = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            if is_blank(cell) {
                continue;
            }
            let text = normalize_header(&value_to_text(cell));
            if self.required.contains(&text) {
                columns.push((index, text));
            }
        }

        let duplicates: Vec<(String, usize)> = columns
            .iter()
            .filter(|(_, name)| columns.iter().filter(|(_, other)| other == name).count() > 1)
            .map(|(col, name)| (name.clone(), *col))
            .collect();
        if !duplicates.is_empty() {
            return Err(HeaderFailure::Duplicate(duplicates));
        }

        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|header| !columns.iter().any(|(_, name)| name == *header))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(HeaderFailure::Missing(missing));
        }

        tracing::debug!(matched = columns.len(), width = cells.len(), "header row resolved");

        Ok(HeaderMatch {
            columns,
            width: cells.len(),
        })
    }
}
