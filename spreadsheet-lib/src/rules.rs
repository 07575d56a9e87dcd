//! Failure codes produced by the validator itself and the built-in custom rules.

use serde_json::Value;

pub const UNRESOLVABLE: &str = "unresolvable";
pub const MULTIPLE_SHEETS: &str = "multiple_sheets";
pub const MISSING_HEADER: &str = "missing_header";
pub const DISTINCT_HEADER: &str = "distinct_header";
pub const MIN_ROWS: &str = "min_rows";
pub const MAX_ROWS: &str = "max_rows";
pub const DISTINCT: &str = "distinct";
pub const UNIX_TIMESTAMP: &str = "unix_timestamp";

/// Default message template of a validator-level failure code.
pub fn fallback_message(code: &str) -> Option<&'static str> {
    let template = match code {
        UNRESOLVABLE => "The :attribute can not be parsed",
        MULTIPLE_SHEETS => "The :attribute cannot contain multiple sheets",
        MISSING_HEADER => "The :attribute missing headers: :headers",
        DISTINCT_HEADER => "The :attribute has duplicate headers: :headers",
        MIN_ROWS => "The :attribute requires at least :min rows except the header row",
        MAX_ROWS => "The :attribute allows up to :max rows except the header row",
        DISTINCT => "The :attribute field has a duplicate value.",
        UNIX_TIMESTAMP => "The :attribute must be a date, datetime, or unix timestamp",
        _ => return None,
    };
    Some(template)
}

/// Rules the validator evaluates itself instead of handing them to the rule engine.
pub fn is_builtin(rule: &str) -> bool {
    matches!(rule, DISTINCT | UNIX_TIMESTAMP)
}

/// A positive integer, or a string of digits without a leading zero.
pub fn is_unix_timestamp(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i > 0
            } else {
                n.as_u64().is_some()
            }
        }
        Value::String(s) => {
            !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && !s.starts_with('0')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_unix_timestamp_accepts_positive_values() {
        assert!(is_unix_timestamp(&json!(1_700_000_000)));
        assert!(is_unix_timestamp(&json!("1700000000")));
        assert!(is_unix_timestamp(&json!(1)));
        assert!(is_unix_timestamp(&json!(u64::MAX)));
    }

    #[test]
    fn test_unix_timestamp_rejects_invalid_values() {
        assert!(!is_unix_timestamp(&json!(0)));
        assert!(!is_unix_timestamp(&json!("0")));
        assert!(!is_unix_timestamp(&json!("0123")));
        assert!(!is_unix_timestamp(&json!(-5)));
        assert!(!is_unix_timestamp(&json!("-5")));
        assert!(!is_unix_timestamp(&json!("abc")));
        assert!(!is_unix_timestamp(&json!("")));
        assert!(!is_unix_timestamp(&json!(1.5)));
        assert!(!is_unix_timestamp(&json!(true)));
        assert!(!is_unix_timestamp(&Value::Null));
    }

    #[test]
    fn test_fallback_messages_cover_builtin_codes() {
        for code in [
            UNRESOLVABLE,
            MULTIPLE_SHEETS,
            MISSING_HEADER,
            DISTINCT_HEADER,
            MIN_ROWS,
            MAX_ROWS,
            DISTINCT,
            UNIX_TIMESTAMP,
        ] {
            assert!(fallback_message(code).is_some(), "missing template for {code}");
        }
        assert!(fallback_message("required").is_none());
    }

    proptest! {
        #[test]
        fn test_unix_timestamp_digit_strings(n in 1u64..u64::MAX) {
            prop_assert!(is_unix_timestamp(&json!(n.to_string())));
            let padded = format!("0{}", n);
            prop_assert!(!is_unix_timestamp(&json!(padded)));
        }

        #[test]
        fn test_unix_timestamp_non_positive_integers(n in i64::MIN..=0i64) {
            prop_assert!(!is_unix_timestamp(&json!(n)));
        }
    }
}
