use crate::distinct::DistinctTracker;

/// Mutable state of the row loop: where we are and what has been seen so far.
#[derive(Debug, Default)]
pub struct ValidationContext {
    /// 1-based spreadsheet row number of the row being validated.
    pub current_row: usize,
    pub distinct: DistinctTracker,
}

impl ValidationContext {
    pub fn new(first_row: usize) -> Self {
        ValidationContext {
            current_row: first_row,
            distinct: DistinctTracker::new(),
        }
    }

    /// Back to `first_row` with nothing seen.
    pub fn reset(&mut self, first_row: usize) {
        self.current_row = first_row;
        self.distinct.reset();
    }

    pub fn advance(&mut self) {
        self.current_row += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reset_starts_a_fresh_pass() {
        let mut context = ValidationContext::new(2);
        assert!(context.distinct.check_and_insert("email", &json!("a@x.io")));
        context.advance();
        context.advance();
        assert_eq!(context.current_row, 4);

        context.reset(3);
        assert_eq!(context.current_row, 3);
        assert!(context.distinct.check_and_insert("email", &json!("a@x.io")));
    }
}
