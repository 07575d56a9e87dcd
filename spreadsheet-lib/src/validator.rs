//! The spreadsheet validator: configuration, file inspection and the fail-fast row pass.

use serde_json::Value;
use std::collections::HashMap;

use crate::catalog::{RuleCatalog, RuleSpec};
use crate::columns::{ColumnMap, ColumnMapper, ColumnTypeHints, NamedRow};
use crate::config::{FileConstraints, ValidationConfig};
use crate::context::ValidationContext;
use crate::decoder::{RowIterator, SpreadsheetDecoder};
use crate::engine::{RuleContext, RuleEngine, RuleFailure, RuleOutcome, StandardRuleEngine};
use crate::error::{ConfigError, ValidationFailure};
use crate::headers::{HeaderFailure, HeaderResolver};
use crate::report::{
    ErrorAggregator, ErrorReport, FailedRule, FailureKind, MessageTemplates, display_label,
};
use crate::rules::{
    self, DISTINCT, MAX_ROWS, MIN_ROWS, MULTIPLE_SHEETS, UNIX_TIMESTAMP, UNRESOLVABLE,
};
use crate::stream::RowStream;
use crate::upload::{UploadedFile, check_upload};
use crate::utils::is_blank;

/// Data handed to an after-row hook.
pub struct AfterRow<'a> {
    pub row_number: usize,
    pub row: &'a NamedRow,
}

/// A hook's objection to a row. The message may use `:attribute`.
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub attribute: String,
    pub message: String,
}

impl HookFailure {
    pub fn new(attribute: &str, message: &str) -> Self {
        HookFailure {
            attribute: attribute.to_string(),
            message: message.to_string(),
        }
    }
}

pub type AfterRowHook = Box<dyn Fn(&AfterRow<'_>) -> Result<(), HookFailure>>;

pub struct SpreadsheetValidatorBuilder {
    field_name: String,
    min_rows: usize,
    max_rows: usize,
    max_filesize: u64,
    data_row_start_index: usize,
    catalog: RuleCatalog,
    messages: MessageTemplates,
    engine: Option<Box<dyn RuleEngine>>,
    after: Vec<AfterRowHook>,
}

impl SpreadsheetValidatorBuilder {
    /// Create a builder with the defaults of an upload field: at least one data row,
    /// no row or size ceiling, data starting on row 2.
    pub fn new(field_name: &str, catalog: RuleCatalog) -> Self {
        let defaults = FileConstraints::default();
        SpreadsheetValidatorBuilder {
            field_name: field_name.to_string(),
            min_rows: defaults.min_rows,
            max_rows: defaults.max_rows,
            max_filesize: defaults.max_filesize,
            data_row_start_index: defaults.data_row_start_index,
            catalog,
            messages: MessageTemplates::default(),
            engine: None,
            after: Vec::new(),
        }
    }

    pub fn from_config(config: ValidationConfig) -> Self {
        let catalog = config.rules.with_display_names(config.attributes);
        SpreadsheetValidatorBuilder {
            field_name: config.field_name,
            min_rows: config.min_rows,
            max_rows: config.max_rows,
            max_filesize: config.max_filesize,
            data_row_start_index: config.data_row_start_index,
            catalog,
            messages: MessageTemplates::new(config.messages),
            engine: None,
            after: Vec::new(),
        }
    }

    pub fn min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Kilobytes; 0 disables the check.
    pub fn max_filesize(mut self, max_filesize: u64) -> Self {
        self.max_filesize = max_filesize;
        self
    }

    pub fn data_row_start_index(mut self, index: usize) -> Self {
        self.data_row_start_index = index;
        self
    }

    pub fn message(mut self, key: &str, template: &str) -> Self {
        self.messages.insert(key, template);
        self
    }

    pub fn messages(mut self, messages: HashMap<String, String>) -> Self {
        for (key, template) in messages {
            self.messages.insert(&key, &template);
        }
        self
    }

    pub fn engine(mut self, engine: impl RuleEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Run `hook` after each row whose cells all passed.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AfterRow<'_>) -> Result<(), HookFailure> + 'static,
    {
        self.after.push(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<SpreadsheetValidator, ConfigError> {
        let constraints = FileConstraints::new(
            &self.field_name,
            self.min_rows,
            self.max_rows,
            self.max_filesize,
            self.data_row_start_index,
        )?;

        self.catalog.check_headers()?;

        let engine = self
            .engine
            .unwrap_or_else(|| Box::new(StandardRuleEngine));

        for (attribute, rules) in self.catalog.iter() {
            for rule in rules.iter().filter(|r| !rules::is_builtin(&r.name)) {
                engine
                    .accepts(rule)
                    .map_err(|reason| ConfigError::InvalidRule {
                        attribute: attribute.to_string(),
                        rule: rule.name.clone(),
                        reason,
                    })?;
            }
        }

        Ok(SpreadsheetValidator {
            constraints,
            catalog: self.catalog,
            messages: self.messages,
            engine,
            after: self.after,
        })
    }
}

/// Validates uploaded spreadsheets against a rule catalog.
///
/// A validator holds configuration only; every call to [`SpreadsheetValidator::open`] starts a
/// fresh pass with its own row counter and distinct-value sets.
///
/// ```ignore
/// let catalog = RuleCatalog::new()
///     .attribute("email", ["required", "email", "distinct"])
///     .attribute("name", ["required"])
///     .display_name("name", "Name");
/// let validator = SpreadsheetValidator::builder("file", catalog).build()?;
/// let rows = validator.validate(&upload, &AutoDecoder)?;
/// ```
pub struct SpreadsheetValidator {
    constraints: FileConstraints,
    catalog: RuleCatalog,
    messages: MessageTemplates,
    engine: Box<dyn RuleEngine>,
    after: Vec<AfterRowHook>,
}

impl SpreadsheetValidator {
    pub fn builder(field_name: &str, catalog: RuleCatalog) -> SpreadsheetValidatorBuilder {
        SpreadsheetValidatorBuilder::new(field_name, catalog)
    }

    pub fn from_config(config: ValidationConfig) -> Result<Self, ConfigError> {
        SpreadsheetValidatorBuilder::from_config(config).build()
    }

    pub fn constraints(&self) -> &FileConstraints {
        &self.constraints
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Inspect an upload: file checks, decoding, header resolution and reading every data row.
    ///
    /// Structural failures are recorded on the returned pass; no cell rule has run yet.
    pub fn open<D>(&self, upload: &UploadedFile, decoder: &D) -> ValidationPass<'_>
    where
        D: SpreadsheetDecoder + ?Sized,
    {
        let mut pass = ValidationPass {
            validator: self,
            file_name: upload.client_name.clone(),
            column_map: ColumnMap::default(),
            rows: Vec::new(),
            aggregator: ErrorAggregator::new(),
            context: ValidationContext::new(self.constraints.data_row_start_index),
            outcome: None,
        };

        if let Some(failure) = check_upload(upload, self.constraints.max_filesize) {
            let field = self.constraints.field_name.as_str();
            let label = self.catalog.display_name_of(field).to_string();
            let template = self.messages.template(field, failure.rule, failure.template);
            pass.aggregator.add_failure(
                FailureKind::Structural,
                field,
                &label,
                failure.rule,
                template,
                failure.parameters,
            );
            return pass;
        }

        pass.load(decoder, upload);
        pass
    }

    /// Open and validate in one go.
    pub fn validate<D>(
        &self,
        upload: &UploadedFile,
        decoder: &D,
    ) -> Result<Vec<NamedRow>, ValidationFailure>
    where
        D: SpreadsheetDecoder + ?Sized,
    {
        self.open(upload, decoder).validated()
    }
}

/// One validation pass over one file.
pub struct ValidationPass<'v> {
    validator: &'v SpreadsheetValidator,
    file_name: String,
    column_map: ColumnMap,
    rows: Vec<NamedRow>,
    aggregator: ErrorAggregator,
    context: ValidationContext,
    outcome: Option<bool>,
}

impl<'v> ValidationPass<'v> {
    fn load<D>(&mut self, decoder: &D, upload: &UploadedFile)
    where
        D: SpreadsheetDecoder + ?Sized,
    {
        let validator = self.validator;

        // The workbook is dropped, and its file released, on every return below.
        let mut spreadsheet = match decoder.open(upload) {
            Ok(spreadsheet) => spreadsheet,
            Err(e) => {
                tracing::warn!(file = %self.file_name, error = %e, "spreadsheet could not be opened");
                self.file_failure(UNRESOLVABLE, Vec::new());
                return;
            }
        };

        let sheet_names = spreadsheet.sheet_names();
        if sheet_names.len() > 1 {
            self.file_failure(MULTIPLE_SHEETS, Vec::new());
            return;
        }
        let Some(sheet_name) = sheet_names.into_iter().next() else {
            self.file_failure(UNRESOLVABLE, Vec::new());
            return;
        };

        let mut rows = match spreadsheet.open_sheet(&sheet_name, false) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(file = %self.file_name, error = %e, "sheet could not be read");
                self.file_failure(UNRESOLVABLE, Vec::new());
                return;
            }
        };

        let header_row = match rows.next_row(Some(&ColumnTypeHints::all_text())) {
            Some(Ok(row)) => Some(row),
            Some(Err(e)) => {
                tracing::warn!(file = %self.file_name, error = %e, "header row could not be read");
                self.file_failure(UNRESOLVABLE, Vec::new());
                return;
            }
            None => None,
        };

        let resolver = HeaderResolver::new(&validator.catalog);
        let headers = match resolver.resolve(header_row.as_deref()) {
            Ok(headers) => headers,
            Err(failure) => {
                self.header_failure(&failure);
                return;
            }
        };

        let (column_map, hints) = ColumnMapper::map(&headers, &validator.catalog);
        self.read_rows(rows, &column_map, &hints);
        self.column_map = column_map;
    }

    fn read_rows(
        &mut self,
        rows: Box<dyn RowIterator>,
        column_map: &ColumnMap,
        hints: &ColumnTypeHints,
    ) {
        let start = self.validator.constraints.data_row_start_index;
        for row in RowStream::new(rows, column_map, hints, start) {
            match row {
                Ok(row) => self.rows.push(row),
                Err(e) => {
                    tracing::warn!(file = %self.file_name, error = %e, "data row could not be read");
                    self.rows.clear();
                    self.file_failure(UNRESOLVABLE, Vec::new());
                    return;
                }
            }
        }
        tracing::debug!(file = %self.file_name, rows = self.rows.len(), "data rows read");
    }

    fn header_failure(&mut self, failure: &HeaderFailure) {
        self.file_failure(
            failure.code(),
            vec![("headers".to_string(), failure.headers_parameter())],
        );
    }

    /// Structural failure reported against the uploaded file's name.
    fn file_failure(&mut self, code: &str, parameters: Vec<(String, String)>) {
        let key = self.file_name.clone();
        self.record(FailureKind::Structural, &key, &key, code, None, parameters);
    }

    fn record(
        &mut self,
        kind: FailureKind,
        key: &str,
        label: &str,
        rule: &str,
        default_template: Option<&str>,
        parameters: Vec<(String, String)>,
    ) {
        let validator = self.validator;
        let fallback = default_template
            .or_else(|| rules::fallback_message(rule))
            .unwrap_or("The :attribute is invalid.");
        let template = validator.messages.template(key, rule, fallback);
        self.aggregator
            .add_failure(kind, key, label, rule, template, parameters);
    }

    /// Label of an attribute at the current row, e.g. `email @ C5`.
    pub fn display_label(&self, attribute: &str) -> String {
        let header = self.validator.catalog.header_of(attribute);
        display_label(
            &header,
            self.column_map.column_of(attribute),
            self.context.current_row,
        )
    }

    /// Run the row-count check and then every rule on every cell, stopping at the first failure.
    ///
    /// The verdict is computed once; later calls return it again.
    pub fn passes(&mut self) -> bool {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = self.run();
        self.outcome = Some(outcome);
        tracing::info!(file = %self.file_name, rows = self.rows.len(), passed = outcome, "validation finished");
        outcome
    }

    pub fn fails(&mut self) -> bool {
        !self.passes()
    }

    fn run(&mut self) -> bool {
        if !self.aggregator.passes() {
            return false;
        }

        let validator = self.validator;
        let constraints = &validator.constraints;
        let field = constraints.field_name.as_str();
        let field_label = validator.catalog.display_name_of(field).to_string();
        let count = self.rows.len();

        if constraints.min_rows > 0 && count < constraints.min_rows {
            self.record(
                FailureKind::Count,
                field,
                &field_label,
                MIN_ROWS,
                None,
                vec![("min".to_string(), constraints.min_rows.to_string())],
            );
            return false;
        }

        if constraints.max_rows > 0 && count > constraints.max_rows {
            self.record(
                FailureKind::Count,
                field,
                &field_label,
                MAX_ROWS,
                None,
                vec![("max".to_string(), constraints.max_rows.to_string())],
            );
            return false;
        }

        self.context.reset(constraints.data_row_start_index);

        let rows = std::mem::take(&mut self.rows);
        let passed = self.validate_rows(&rows);
        self.rows = rows;
        passed
    }

    fn validate_rows(&mut self, rows: &[NamedRow]) -> bool {
        let validator = self.validator;

        for row in rows {
            for (attribute, rules) in validator.catalog.iter() {
                let value = row.get(attribute).unwrap_or(&Value::Null);
                for rule in rules {
                    if let Some(failure) = self.check_rule(attribute, value, rule, rules, row) {
                        let label = self.display_label(attribute);
                        self.record(
                            FailureKind::Field,
                            attribute,
                            &label,
                            &rule.name,
                            Some(&failure.template),
                            failure.parameters,
                        );
                        return false;
                    }
                }
            }

            let after_row = AfterRow {
                row_number: self.context.current_row,
                row,
            };
            for hook in &validator.after {
                if let Err(failure) = hook(&after_row) {
                    let label = self.display_label(&failure.attribute);
                    self.record(
                        FailureKind::Field,
                        &failure.attribute,
                        &label,
                        "after",
                        Some(&failure.message),
                        Vec::new(),
                    );
                    return false;
                }
            }

            self.context.advance();
        }

        true
    }

    /// Evaluate one rule on one cell; `Some` describes the failure.
    fn check_rule(
        &mut self,
        attribute: &str,
        value: &Value,
        rule: &RuleSpec,
        rules: &[RuleSpec],
        row: &NamedRow,
    ) -> Option<RuleFailure> {
        let validator = self.validator;
        let engine = validator.engine.as_ref();
        if is_blank(value) && !engine.is_implicit(&rule.name) {
            return None;
        }

        let outcome = match rule.name.as_str() {
            DISTINCT => {
                if self.context.distinct.check_and_insert(attribute, value) {
                    RuleOutcome::Pass
                } else {
                    RuleOutcome::Fail(RuleFailure::new(
                        rules::fallback_message(DISTINCT).unwrap_or_default(),
                    ))
                }
            }
            UNIX_TIMESTAMP => {
                if rules::is_unix_timestamp(value) {
                    RuleOutcome::Pass
                } else {
                    RuleOutcome::Fail(RuleFailure::new(
                        rules::fallback_message(UNIX_TIMESTAMP).unwrap_or_default(),
                    ))
                }
            }
            _ => {
                let context = RuleContext {
                    attribute,
                    row_number: self.context.current_row,
                    row,
                    rules,
                };
                engine.evaluate(value, rule, &context)
            }
        };

        match outcome {
            RuleOutcome::Pass => None,
            RuleOutcome::Fail(failure) => Some(failure),
        }
    }

    pub fn errors(&self) -> &ErrorReport {
        self.aggregator.report()
    }

    pub fn failed_rules(&self) -> &[FailedRule] {
        self.aggregator.failed_rules()
    }

    pub fn has_failure_kind(&self, kind: FailureKind) -> bool {
        self.aggregator.has_kind(kind)
    }

    /// Data rows read from the file, valid or not.
    pub fn rows(&self) -> &[NamedRow] {
        &self.rows
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.column_map
    }

    /// Spreadsheet row the pass stopped at (or would continue from).
    pub fn current_row(&self) -> usize {
        self.context.current_row
    }

    /// The dataset, if every check passed; otherwise the full error report.
    pub fn validated(mut self) -> Result<Vec<NamedRow>, ValidationFailure> {
        if self.passes() {
            Ok(self.rows)
        } else {
            Err(ValidationFailure::new(self.aggregator.into_report()))
        }
    }
}
