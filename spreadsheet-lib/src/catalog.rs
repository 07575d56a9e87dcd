//! Rule catalog: which attributes a spreadsheet must carry and how each is validated.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::rules::UNIX_TIMESTAMP;
use crate::utils::normalize_header;

/// A compiled JSON Schema attached to a `schema` rule.
#[derive(Clone)]
pub struct CompiledSchema {
    pub raw: Value,
    pub validator: Arc<jsonschema::Validator>,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("raw", &self.raw)
            .finish()
    }
}

/// One named rule with its parameters, e.g. `between:1,10`.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub parameters: Vec<String>,
    pub schema: Option<CompiledSchema>,
}

impl PartialEq for RuleSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.schema.as_ref().map(|s| &s.raw) == other.schema.as_ref().map(|s| &s.raw)
    }
}

impl RuleSpec {
    /// Parse the `name:param1,param2` notation.
    pub fn parse(text: &str) -> RuleSpec {
        let text = text.trim();
        match text.split_once(':') {
            Some((name, params)) => RuleSpec {
                name: name.trim().to_string(),
                parameters: params.split(',').map(|p| p.trim().to_string()).collect(),
                schema: None,
            },
            None => RuleSpec {
                name: text.to_string(),
                parameters: Vec::new(),
                schema: None,
            },
        }
    }

    /// Build a `schema` rule, compiling the schema up front.
    pub fn schema(attribute: &str, schema: Value) -> Result<RuleSpec, ConfigError> {
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| ConfigError::InvalidSchema {
                attribute: attribute.to_string(),
                message: e.to_string(),
            })?;
        Ok(RuleSpec {
            name: "schema".to_string(),
            parameters: Vec::new(),
            schema: Some(CompiledSchema {
                raw: schema,
                validator: Arc::new(validator),
            }),
        })
    }

    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }
}

impl From<&str> for RuleSpec {
    fn from(text: &str) -> Self {
        RuleSpec::parse(text)
    }
}

/// Serialized form of a rule: either `"max:255"` or `{"rule": "...", ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Text(String),
    Object {
        rule: String,
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(default)]
        schema: Option<Value>,
    },
}

/// Ordered mapping attribute -> rules, plus display-name overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct RuleCatalog {
    entries: Vec<(String, Vec<RuleSpec>)>,
    display_names: HashMap<String, String>,
}

impl RuleCatalog {
    pub fn new() -> Self {
        RuleCatalog::default()
    }

    /// Add (or replace) the rules of an attribute. New attributes keep insertion order.
    pub fn attribute<I, R>(mut self, attribute: &str, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RuleSpec>,
    {
        self.insert(attribute, rules.into_iter().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, attribute: &str, rules: Vec<RuleSpec>) {
        match self.entries.iter_mut().find(|(name, _)| name == attribute) {
            Some((_, existing)) => *existing = rules,
            None => self.entries.push((attribute.to_string(), rules)),
        }
    }

    /// Override the name an attribute goes by in the header row and in messages.
    pub fn display_name(mut self, attribute: &str, display_name: &str) -> Self {
        self.display_names
            .insert(attribute.to_string(), display_name.to_string());
        self
    }

    pub fn with_display_names(mut self, display_names: HashMap<String, String>) -> Self {
        self.display_names.extend(display_names);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Attributes and their rules, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RuleSpec])> {
        self.entries
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn rules_for(&self, attribute: &str) -> Option<&[RuleSpec]> {
        self.entries
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn has_rule(&self, attribute: &str, rule: &str) -> bool {
        self.rules_for(attribute)
            .is_some_and(|rules| rules.iter().any(|r| r.name == rule))
    }

    pub fn has_timestamp_rule(&self, attribute: &str) -> bool {
        self.has_rule(attribute, UNIX_TIMESTAMP)
    }

    /// Name shown for an attribute: the override if present, else the attribute key.
    pub fn display_name_of<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.display_names
            .get(attribute)
            .map(String::as_str)
            .unwrap_or(attribute)
    }

    /// Header text an attribute is expected under: its display name, normalized like header cells.
    pub fn header_of(&self, attribute: &str) -> String {
        normalize_header(self.display_name_of(attribute))
    }

    /// Inverse lookup: the attribute a normalized header text stands for.
    ///
    /// Attributes are tried in catalog order; a header no attribute claims is its own key.
    pub fn attribute_for_header(&self, header: &str) -> String {
        self.entries
            .iter()
            .find(|(attribute, _)| self.header_of(attribute) == header)
            .map(|(attribute, _)| attribute.clone())
            .unwrap_or_else(|| header.to_string())
    }

    /// Headers of all catalog attributes, in catalog order.
    pub fn required_headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = Vec::with_capacity(self.entries.len());
        for (attribute, _) in &self.entries {
            let header = self.header_of(attribute);
            if !headers.contains(&header) {
                headers.push(header);
            }
        }
        headers
    }

    /// Every attribute must own its header column.
    pub fn check_headers(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<(String, &str)> = Vec::with_capacity(self.entries.len());
        for (attribute, _) in &self.entries {
            let header = self.header_of(attribute);
            if let Some((_, other)) = seen.iter().find(|(h, _)| *h == header) {
                return Err(ConfigError::Catalog(format!(
                    "attributes '{}' and '{}' share the header '{}'",
                    other, attribute, header
                )));
            }
            seen.push((header, attribute.as_str()));
        }
        Ok(())
    }
}

impl TryFrom<Map<String, Value>> for RuleCatalog {
    type Error = ConfigError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut catalog = RuleCatalog::new();
        for (attribute, value) in map {
            let raw_rules: Vec<RawRule> = match value {
                Value::String(text) => text
                    .split('|')
                    .map(|part| RawRule::Text(part.to_string()))
                    .collect(),
                other => serde_json::from_value(other).map_err(|e| {
                    ConfigError::Catalog(format!("rules of '{}': {}", attribute, e))
                })?,
            };

            let mut rules = Vec::with_capacity(raw_rules.len());
            for raw in raw_rules {
                let rule = match raw {
                    RawRule::Text(text) => RuleSpec::parse(&text),
                    RawRule::Object {
                        rule,
                        schema: Some(schema),
                        ..
                    } if rule == "schema" => RuleSpec::schema(&attribute, schema)?,
                    RawRule::Object {
                        rule, parameters, ..
                    } => RuleSpec {
                        name: rule,
                        parameters,
                        schema: None,
                    },
                };
                rules.push(rule);
            }
            catalog.insert(&attribute, rules);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_spec_parse() {
        let rule = RuleSpec::parse("between:1, 10");
        assert_eq!(rule.name, "between");
        assert_eq!(rule.parameters, vec!["1", "10"]);

        let rule = RuleSpec::parse("required");
        assert_eq!(rule.name, "required");
        assert!(rule.parameters.is_empty());
    }

    #[test]
    fn test_required_headers_apply_overrides_in_catalog_order() {
        let catalog = RuleCatalog::new()
            .attribute("email", ["required"])
            .attribute("name", ["required"])
            .display_name("name", "Name");

        assert_eq!(catalog.required_headers(), vec!["email", "Name"]);
    }

    #[test]
    fn test_attribute_for_header_inverts_overrides() {
        let catalog = RuleCatalog::new()
            .attribute("name", ["required"])
            .display_name("name", "Full Name");

        assert_eq!(catalog.attribute_for_header("Full Name"), "name");
        assert_eq!(catalog.attribute_for_header("email"), "email");
    }

    #[test]
    fn test_display_names_are_normalized_like_header_cells() {
        let catalog = RuleCatalog::new()
            .attribute("name", ["required"])
            .attribute("first  name", ["required"])
            .display_name("name", " Full  Name ");

        assert_eq!(catalog.required_headers(), vec!["Full Name", "first name"]);
        assert_eq!(catalog.attribute_for_header("Full Name"), "name");
        assert_eq!(catalog.attribute_for_header("first name"), "first  name");
    }

    #[test]
    fn test_shared_headers_are_rejected() {
        let catalog = RuleCatalog::new()
            .attribute("email", ["required"])
            .attribute("mail", ["required"])
            .display_name("mail", "email ");

        match catalog.check_headers() {
            Err(ConfigError::Catalog(message)) => {
                assert_eq!(message, "attributes 'email' and 'mail' share the header 'email'")
            }
            other => panic!("expected a catalog error, got {:?}", other),
        }
        assert!(RuleCatalog::new()
            .attribute("email", ["required"])
            .check_headers()
            .is_ok());
    }

    #[test]
    fn test_insert_replaces_existing_attribute_in_place() {
        let mut catalog = RuleCatalog::new()
            .attribute("a", ["required"])
            .attribute("b", ["required"]);
        catalog.insert("a", vec![RuleSpec::parse("integer")]);

        let names: Vec<&str> = catalog.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(catalog.has_rule("a", "integer"));
        assert!(!catalog.has_rule("a", "required"));
    }

    #[test]
    fn test_catalog_from_json_map_keeps_order_and_forms() {
        let map = json!({
            "zeta": "required|string",
            "alpha": ["required", {"rule": "between", "parameters": ["1", "5"]}],
            "created": ["unix_timestamp"],
            "code": [{"rule": "schema", "schema": {"type": "string", "pattern": "^[A-Z]+$"}}]
        });
        let Value::Object(map) = map else {
            unreachable!()
        };

        let catalog = RuleCatalog::try_from(map).unwrap();
        let names: Vec<&str> = catalog.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "created", "code"]);
        assert_eq!(catalog.rules_for("zeta").unwrap().len(), 2);
        assert_eq!(
            catalog.rules_for("alpha").unwrap()[1].parameters,
            vec!["1", "5"]
        );
        assert!(catalog.has_timestamp_rule("created"));
        assert!(catalog.rules_for("code").unwrap()[0].schema.is_some());
    }

    #[test]
    fn test_catalog_rejects_invalid_schema() {
        let map = json!({
            "code": [{"rule": "schema", "schema": {"type": 42}}]
        });
        let Value::Object(map) = map else {
            unreachable!()
        };

        let result = RuleCatalog::try_from(map);
        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
    }
}
