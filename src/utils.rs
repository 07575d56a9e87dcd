use serde::Serialize;
use spreadsheet_lib::utils::write_error_to_log;
use spreadsheet_lib::{ErrorReport, UploadedFile};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr so that stdout only carries JSON.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Describe a local file as an upload. A missing file is still described, so that the
/// validator reports it instead of the CLI.
pub fn local_upload(path: &Path, client_name: Option<&str>) -> UploadedFile {
    let mut upload = match UploadedFile::from_path(path) {
        Ok(upload) => upload,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "upload is not readable");
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            UploadedFile::new(path, name, 0)
        }
    };
    if let Some(name) = client_name {
        upload.client_name = name.to_string();
    }
    upload
}

/// Pretty-print `value` as JSON into `output`, or to stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Append every message of a failed validation to the error log.
pub fn log_validation_failure(log_file: &Path, file_name: &str, report: &ErrorReport) {
    let mut lines = Vec::with_capacity(report.len());
    for (key, messages) in report.iter() {
        for message in messages {
            lines.push(format!("{key}: {message}"));
        }
    }
    write_error_to_log(
        log_file,
        &format!("Spreadsheet Validation Error ({file_name})"),
        &lines.join("\n"),
    );
}
