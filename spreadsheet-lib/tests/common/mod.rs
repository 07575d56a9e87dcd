use spreadsheet_lib::{RuleCatalog, SpreadsheetValidator, UploadedFile};
use std::path::Path;

// Re-export shared test utilities from src/test_utils.rs
pub use spreadsheet_lib::test_utils::{MemoryDecoder, sample_catalog, text_rows, write_upload};

/// Write a CSV fixture under `dir`.
#[allow(dead_code)]
pub fn csv_upload(dir: &Path, name: &str, lines: &[&str]) -> UploadedFile {
    let mut contents = lines.join("\n");
    contents.push('\n');
    write_upload(dir, name, contents.as_bytes())
}

/// An upload whose contents are irrelevant, for use with `MemoryDecoder`.
#[allow(dead_code)]
pub fn placeholder_upload(dir: &Path) -> UploadedFile {
    write_upload(dir, "contacts.xlsx", b"placeholder")
}

/// `email` (required, distinct) and `name` (required) shown as "Name".
#[allow(dead_code)]
pub fn contacts_catalog() -> RuleCatalog {
    RuleCatalog::new()
        .attribute("email", ["required", "email", "distinct"])
        .attribute("name", ["required"])
        .display_name("name", "Name")
}

#[allow(dead_code)]
pub fn contacts_validator() -> SpreadsheetValidator {
    SpreadsheetValidator::builder("file", contacts_catalog())
        .build()
        .unwrap()
}
