//! The uploaded file and the checks it must pass before it is decoded.

use std::path::{Path, PathBuf};

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// Reference to an uploaded spreadsheet: where it lives, what the client called it and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub client_name: String,
    /// Bytes.
    pub size: u64,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, client_name: &str, size: u64) -> Self {
        UploadedFile {
            path: path.into(),
            client_name: client_name.to_string(),
            size,
        }
    }

    /// Build a reference to a local file, taking its name and size from the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let client_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(UploadedFile {
            path: path.to_path_buf(),
            client_name,
            size,
        })
    }

    /// Lowercased extension of the client file name.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.client_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// A file rule the upload did not satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRuleFailure {
    pub rule: &'static str,
    pub template: &'static str,
    pub parameters: Vec<(String, String)>,
}

/// Run the field's file rules (`required`, `file`, `mimes`, `max`) in order, stopping at the first failure.
pub fn check_upload(upload: &UploadedFile, max_filesize: u64) -> Option<UploadRuleFailure> {
    if !upload.path.exists() {
        return Some(UploadRuleFailure {
            rule: "required",
            template: "The :attribute field is required.",
            parameters: Vec::new(),
        });
    }

    if !upload.path.is_file() {
        return Some(UploadRuleFailure {
            rule: "file",
            template: "The :attribute must be a file.",
            parameters: Vec::new(),
        });
    }

    let accepted = upload
        .extension()
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));
    if !accepted {
        return Some(UploadRuleFailure {
            rule: "mimes",
            template: "The :attribute must be a file of type: :values.",
            parameters: vec![("values".to_string(), ACCEPTED_EXTENSIONS.join(", "))],
        });
    }

    if max_filesize > 0 && upload.size > max_filesize.saturating_mul(1024) {
        return Some(UploadRuleFailure {
            rule: "max",
            template: "The :attribute may not be greater than :max kilobytes.",
            parameters: vec![("max".to_string(), max_filesize.to_string())],
        });
    }

    None
}
