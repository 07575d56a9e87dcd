// reset; cargo run -- --file ./data/contacts.xlsx --config ./data/contacts.rules.json
// reset; cargo run -- --file /tmp/upload-3f2a --name contacts.csv --config ./data/contacts.rules.json --output rows.json

mod utils;

use anyhow::Context;
use clap::Parser;
use spreadsheet_lib::{AutoDecoder, ERRORS_LOG_FILE, SpreadsheetValidator, ValidationConfig};
use std::path::{Path, PathBuf};
use utils::{init_tracing, local_upload, log_validation_failure, write_json};

#[derive(Parser)]
#[command(name = "spreadsheet-request")]
#[command(about = "A tool to validate spreadsheet uploads against a rule catalog")]
#[command(version)]
struct Args {
    /// Path to the spreadsheet to validate (xlsx, xls or csv)
    #[arg(short, long)]
    file: PathBuf,

    /// Path to the JSON validation config (rules, attributes, messages and file constraints)
    #[arg(short, long)]
    config: PathBuf,

    /// Original client file name, when the file on disk has a temporary name
    #[arg(long)]
    name: Option<String>,

    /// Write the validated rows here instead of printing them
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log header resolution and row reading
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let arguments = Args::parse();
    init_tracing(arguments.verbose);

    let config = ValidationConfig::from_path(&arguments.config)
        .with_context(|| format!("loading {}", arguments.config.display()))?;
    let validator = SpreadsheetValidator::from_config(config)?;
    let upload = local_upload(&arguments.file, arguments.name.as_deref());

    match validator.validate(&upload, &AutoDecoder) {
        Ok(rows) => {
            write_json(&rows, arguments.output.as_ref())?;
            eprintln!("✅ Validation completed! {} rows", rows.len());
        }
        Err(failure) => {
            write_json(failure.report(), None)?;
            log_validation_failure(
                Path::new(ERRORS_LOG_FILE),
                &upload.client_name,
                failure.report(),
            );
            eprintln!("❌ {failure}");
            eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE);
            std::process::exit(1);
        }
    }

    Ok(())
}
