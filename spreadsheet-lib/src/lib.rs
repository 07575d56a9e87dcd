#![allow(clippy::needless_return)]

pub mod catalog;
pub mod columns;
pub mod config;
pub mod context;
pub mod decoder;
pub mod distinct;
pub mod engine;
pub mod error;
pub mod headers;
pub mod report;
pub mod rules;
pub mod stream;
pub mod upload;
pub mod utils;
pub mod validator;

// Test utilities - only compiled when testing or with test feature
// #[cfg(test)] alone doesn't work for integration tests (they're external crates)
// The feature flag makes it available to integration tests via dev-dependencies
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use catalog::{RuleCatalog, RuleSpec};
pub use columns::NamedRow;
pub use config::{FileConstraints, ValidationConfig};
pub use decoder::{AutoDecoder, CalamineDecoder, CsvDecoder, SpreadsheetDecoder};
pub use engine::{RuleEngine, StandardRuleEngine};
pub use error::{ConfigError, DecodeError, ValidationFailure};
pub use report::{ErrorReport, FailureKind};
pub use upload::UploadedFile;
pub use validator::{
    AfterRow, HookFailure, SpreadsheetValidator, SpreadsheetValidatorBuilder, ValidationPass,
};

pub const ERRORS_LOG_FILE: &str = "errors.log";
