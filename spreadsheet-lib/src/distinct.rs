use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Values already seen per attribute during one validation pass.
///
/// Equality is strict JSON value equality: `"1"` and `1` are different values, strings are
/// compared exactly (case and whitespace included).
#[derive(Debug, Default)]
pub struct DistinctTracker {
    seen: HashMap<String, HashSet<String>>,
}

impl DistinctTracker {
    pub fn new() -> Self {
        DistinctTracker::default()
    }

    /// Record `value` for `attribute`. Returns `false` if it was already recorded.
    pub fn check_and_insert(&mut self, attribute: &str, value: &Value) -> bool {
        // Serialized JSON keeps the type, so it is a faithful key for scalar equality.
        self.seen
            .entry(attribute.to_string())
            .or_default()
            .insert(value.to_string())
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_second_occurrence_fails() {
        let mut tracker = DistinctTracker::new();
        assert!(tracker.check_and_insert("email", &json!("a")));
        assert!(!tracker.check_and_insert("email", &json!("a")));
        assert!(tracker.check_and_insert("email", &json!("b")));
        assert!(!tracker.check_and_insert("email", &json!("b")));
    }

    #[test]
    fn test_attributes_are_tracked_separately() {
        let mut tracker = DistinctTracker::new();
        assert!(tracker.check_and_insert("a", &json!("x")));
        assert!(tracker.check_and_insert("b", &json!("x")));
    }

    #[test]
    fn test_equality_is_type_aware() {
        let mut tracker = DistinctTracker::new();
        assert!(tracker.check_and_insert("code", &json!(1)));
        assert!(tracker.check_and_insert("code", &json!("1")));
        assert!(tracker.check_and_insert("code", &json!("A")));
        assert!(tracker.check_and_insert("code", &json!("a")));
        assert!(!tracker.check_and_insert("code", &json!(1)));
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut tracker = DistinctTracker::new();
        tracker.check_and_insert("a", &json!("x"));
        tracker.reset();
        assert!(tracker.check_and_insert("a", &json!("x")));
    }
}
