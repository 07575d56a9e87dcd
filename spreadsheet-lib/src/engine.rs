//! The rule-evaluation seam and a standard engine for the common named rules.

use serde_json::Value;

use crate::catalog::RuleSpec;
use crate::columns::NamedRow;
use crate::utils::{is_blank, parse_datetime_to_epoch, value_to_text};

/// What a rule gets to look at besides the cell value.
pub struct RuleContext<'a> {
    pub attribute: &'a str,
    /// 1-based spreadsheet row number.
    pub row_number: usize,
    pub row: &'a NamedRow,
    /// Every rule of the attribute, for rules whose meaning depends on their siblings.
    pub rules: &'a [RuleSpec],
}

impl RuleContext<'_> {
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    /// Message template; `:attribute` and every parameter name prefixed with `:` get replaced.
    pub template: String,
    pub parameters: Vec<(String, String)>,
}

impl RuleFailure {
    pub fn new(template: &str) -> Self {
        RuleFailure {
            template: template.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.push((name.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Pass,
    Fail(RuleFailure),
}

impl RuleOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, RuleOutcome::Pass)
    }

    fn check(condition: bool, failure: impl FnOnce() -> RuleFailure) -> RuleOutcome {
        if condition {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Fail(failure())
        }
    }
}

pub trait RuleEngine {
    /// Whether this engine can evaluate `rule`; `Err` carries the reason it cannot.
    fn accepts(&self, rule: &RuleSpec) -> Result<(), String>;

    /// Implicit rules run even when the cell is empty; every other rule is skipped for empty cells.
    fn is_implicit(&self, rule: &str) -> bool {
        rule == "required"
    }

    fn evaluate(&self, value: &Value, rule: &RuleSpec, context: &RuleContext<'_>) -> RuleOutcome;
}

/// Evaluates `required`, `nullable`, `string`, `integer`, `numeric`, `boolean`, `email`, `min`,
/// `max`, `between`, `in`, `not_in`, `digits`, `date` and `schema`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardRuleEngine;

const RULES: [&str; 15] = [
    "required", "nullable", "string", "integer", "numeric", "boolean", "email", "min", "max",
    "between", "in", "not_in", "digits", "date", "schema",
];

impl RuleEngine for StandardRuleEngine {
    fn accepts(&self, rule: &RuleSpec) -> Result<(), String> {
        if !RULES.contains(&rule.name.as_str()) {
            return Err("unknown rule".to_string());
        }

        let numeric_parameters = |count: usize| -> Result<(), String> {
            if rule.parameters.len() != count {
                return Err(format!("expects {} parameter(s)", count));
            }
            for parameter in &rule.parameters {
                if parameter.parse::<f64>().is_err() {
                    return Err(format!("parameter '{}' is not a number", parameter));
                }
            }
            Ok(())
        };

        match rule.name.as_str() {
            "min" | "max" => numeric_parameters(1),
            "between" => numeric_parameters(2),
            "digits" => match rule.parameter(0).map(str::parse::<usize>) {
                Some(Ok(_)) if rule.parameters.len() == 1 => Ok(()),
                _ => Err("expects one whole-number parameter".to_string()),
            },
            "in" | "not_in" if rule.parameters.is_empty() => {
                Err("expects at least one value".to_string())
            }
            "schema" if rule.schema.is_none() => Err("missing JSON schema".to_string()),
            _ => Ok(()),
        }
    }

    fn evaluate(&self, value: &Value, rule: &RuleSpec, context: &RuleContext<'_>) -> RuleOutcome {
        match rule.name.as_str() {
            "required" => RuleOutcome::check(!is_blank(value), || {
                RuleFailure::new("The :attribute field is required.")
            }),
            "nullable" => RuleOutcome::Pass,
            "string" => RuleOutcome::check(value.is_string(), || {
                RuleFailure::new("The :attribute must be a string.")
            }),
            "integer" => RuleOutcome::check(is_integer(value), || {
                RuleFailure::new("The :attribute must be an integer.")
            }),
            "numeric" => RuleOutcome::check(as_number(value).is_some(), || {
                RuleFailure::new("The :attribute must be a number.")
            }),
            "boolean" => RuleOutcome::check(is_boolean(value), || {
                RuleFailure::new("The :attribute field must be true or false.")
            }),
            "email" => RuleOutcome::check(is_email(&value_to_text(value)), || {
                RuleFailure::new("The :attribute must be a valid email address.")
            }),
            "min" | "max" | "between" => evaluate_size(value, rule, context),
            "in" => {
                let text = value_to_text(value);
                RuleOutcome::check(rule.parameters.contains(&text), || {
                    RuleFailure::new("The selected :attribute is invalid.")
                        .with("values", rule.parameters.join(", "))
                })
            }
            "not_in" => {
                let text = value_to_text(value);
                RuleOutcome::check(!rule.parameters.contains(&text), || {
                    RuleFailure::new("The selected :attribute is invalid.")
                })
            }
            "digits" => {
                let text = value_to_text(value);
                let length = rule.parameter(0).unwrap_or_default();
                let valid = text.bytes().all(|b| b.is_ascii_digit())
                    && length.parse::<usize>().is_ok_and(|n| n == text.len());
                RuleOutcome::check(valid, || {
                    RuleFailure::new("The :attribute must be :digits digits.").with("digits", length)
                })
            }
            "date" => {
                let valid = match value {
                    Value::Number(_) => true,
                    Value::String(s) => parse_datetime_to_epoch(s).is_some(),
                    _ => false,
                };
                RuleOutcome::check(valid, || {
                    RuleFailure::new("The :attribute is not a valid date.")
                })
            }
            "schema" => match &rule.schema {
                Some(schema) => match schema.validator.iter_errors(value).next() {
                    None => RuleOutcome::Pass,
                    Some(error) => RuleOutcome::Fail(
                        RuleFailure::new("The :attribute is invalid: :reason")
                            .with("reason", error.to_string()),
                    ),
                },
                None => RuleOutcome::Fail(RuleFailure::new("The :attribute is invalid.")),
            },
            _ => RuleOutcome::Fail(
                RuleFailure::new("The :attribute has an unsupported rule :rule.")
                    .with("rule", rule.name.clone()),
            ),
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.trim(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

fn is_email(text: &str) -> bool {
    let text = text.trim();
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// `min`, `max` and `between` compare the number itself when the attribute is numeric,
/// otherwise the character count of the value.
fn evaluate_size(value: &Value, rule: &RuleSpec, context: &RuleContext<'_>) -> RuleOutcome {
    let numeric = context.has_rule("numeric") || context.has_rule("integer");
    let size = match (numeric, as_number(value)) {
        (true, Some(number)) => number,
        _ => value_to_text(value).chars().count() as f64,
    };
    let unit = if numeric { "" } else { " characters" };
    let bound = |index: usize| {
        rule.parameter(index)
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or_default()
    };
    let text = |index: usize| rule.parameter(index).unwrap_or_default().to_string();

    match rule.name.as_str() {
        "min" => RuleOutcome::check(size >= bound(0), || {
            RuleFailure::new(&format!("The :attribute must be at least :min{}.", unit))
                .with("min", text(0))
        }),
        "max" => RuleOutcome::check(size <= bound(0), || {
            RuleFailure::new(&format!("The :attribute may not be greater than :max{}.", unit))
                .with("max", text(0))
        }),
        _ => RuleOutcome::check(size >= bound(0) && size <= bound(1), || {
            RuleFailure::new(&format!("The :attribute must be between :min and :max{}.", unit))
                .with("min", text(0))
                .with("max", text(1))
        }),
    }
}
