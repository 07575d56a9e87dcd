//! Error collection, message rendering and cell-accurate labels.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::HashMap;

use crate::headers::cell_reference;

/// Attribute (or file/field label) -> rendered messages, in the order failures were recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    entries: Vec<(String, Vec<String>)>,
}

impl ErrorReport {
    pub fn add(&mut self, key: &str, message: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, messages)) => messages.push(message.to_string()),
            None => self
                .entries
                .push((key.to_string(), vec![message.to_string()])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, messages)| (k.as_str(), messages.as_slice()))
    }

    pub fn first_message(&self) -> Option<&str> {
        self.entries
            .first()
            .and_then(|(_, messages)| messages.first())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for ErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, messages) in &self.entries {
            map.serialize_entry(key, messages)?;
        }
        map.end()
    }
}

/// When in the pass a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file itself: upload checks, decoding, sheets and headers.
    Structural,
    /// Number of data rows.
    Count,
    /// A single cell.
    Field,
}

/// A failed rule with the parameters its message was rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRule {
    pub key: String,
    pub rule: String,
    pub kind: FailureKind,
    pub parameters: Vec<(String, String)>,
}

/// Custom message templates, looked up by `"<attribute>.<rule>"` first and then by `"<rule>"`.
#[derive(Debug, Clone, Default)]
pub struct MessageTemplates {
    custom: HashMap<String, String>,
}

impl MessageTemplates {
    pub fn new(custom: HashMap<String, String>) -> Self {
        MessageTemplates { custom }
    }

    pub fn insert(&mut self, key: &str, template: &str) {
        self.custom.insert(key.to_string(), template.to_string());
    }

    pub fn template<'a>(&'a self, attribute: &str, rule: &str, fallback: &'a str) -> &'a str {
        self.custom
            .get(&format!("{}.{}", attribute, rule))
            .or_else(|| self.custom.get(rule))
            .map(String::as_str)
            .unwrap_or(fallback)
    }
}

/// Replace `:attribute` with the label and every `:<parameter>` with its value.
///
/// Longer parameter names go first so `:max` never eats into `:maximum`.
pub fn render(template: &str, label: &str, parameters: &[(String, String)]) -> String {
    let mut ordered: Vec<&(String, String)> = parameters.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut message = template.replace(":attribute", label);
    for (name, value) in ordered {
        message = message.replace(&format!(":{}", name), value);
    }
    message
}

/// `"<display-name> @ <column><row>"` for attributes backed by a header column, else the name.
pub fn display_label(display_name: &str, column: Option<usize>, row: usize) -> String {
    match column {
        Some(column) => format!("{} @ {}", display_name, cell_reference(column, row)),
        None => display_name.to_string(),
    }
}

/// Collects failures of one validation pass.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    report: ErrorReport,
    failed: Vec<FailedRule>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        ErrorAggregator::default()
    }

    /// Render and record a failure. `template` is the message already chosen for it.
    pub fn add_failure(
        &mut self,
        kind: FailureKind,
        key: &str,
        label: &str,
        rule: &str,
        template: &str,
        parameters: Vec<(String, String)>,
    ) {
        let message = render(template, label, &parameters);
        tracing::warn!(kind = ?kind, key, rule, message = %message, "validation failure");

        self.report.add(key, &message);
        self.failed.push(FailedRule {
            key: key.to_string(),
            rule: rule.to_string(),
            kind,
            parameters,
        });
    }

    pub fn passes(&self) -> bool {
        self.report.is_empty()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.failed.iter().any(|f| f.kind == kind)
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn failed_rules(&self) -> &[FailedRule] {
        &self.failed
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_attribute_and_parameters() {
        let message = render(
            "The :attribute must be between :min and :max.",
            "age @ B3",
            &params(&[("min", "1"), ("max", "9")]),
        );
        assert_eq!(message, "The age @ B3 must be between 1 and 9.");
    }

    #[test]
    fn test_render_prefers_longer_parameter_names() {
        let message = render(":max / :maximum", "x", &params(&[("max", "1"), ("maximum", "2")]));
        assert_eq!(message, "1 / 2");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("email", Some(2), 5), "email @ C5");
        assert_eq!(display_label("file", None, 5), "file");
    }

    #[test]
    fn test_templates_prefer_attribute_specific_messages() {
        let mut templates = MessageTemplates::default();
        templates.insert("required", "Need :attribute");
        templates.insert("email.required", "Email please");

        assert_eq!(templates.template("email", "required", "fallback"), "Email please");
        assert_eq!(templates.template("name", "required", "fallback"), "Need :attribute");
        assert_eq!(templates.template("name", "min", "fallback"), "fallback");
    }

    #[test]
    fn test_aggregator_records_failures() {
        let mut aggregator = ErrorAggregator::new();
        assert!(aggregator.passes());

        aggregator.add_failure(
            FailureKind::Count,
            "file",
            "file",
            "min_rows",
            "The :attribute requires at least :min rows except the header row",
            params(&[("min", "2")]),
        );

        assert!(!aggregator.passes());
        assert!(aggregator.has_kind(FailureKind::Count));
        assert!(!aggregator.has_kind(FailureKind::Field));
        assert_eq!(
            aggregator.report().get("file").unwrap(),
            &["The file requires at least 2 rows except the header row".to_string()]
        );
        assert_eq!(aggregator.failed_rules()[0].rule, "min_rows");
    }

    #[test]
    fn test_report_serializes_as_ordered_map() {
        let mut report = ErrorReport::default();
        report.add("zeta", "z1");
        report.add("alpha", "a1");
        report.add("zeta", "z2");

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"zeta":["z1","z2"],"alpha":["a1"]}"#);
    }
}
