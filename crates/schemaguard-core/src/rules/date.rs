use arrow::error::ArrowError;
use arrow_array::{Array, StringArray};

use crate::rules::TypeRule;
use crate::utils::date_parser::parse_datetime_column;

pub struct DateTypeCheck {
    column: String,
}

impl DateTypeCheck {
    pub fn new(column: String) -> Self {
        Self { column }
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl TypeRule for DateTypeCheck {
    fn name(&self) -> &'static str {
        "DateTypeCheck"
    }

    fn first_violation(&self, array: &StringArray) -> Result<Option<usize>, ArrowError> {
        let casted = parse_datetime_column(array);
        Ok((0..casted.len()).find(|&i| casted.is_null(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dates_pass() {
        let check = DateTypeCheck::new("created_at".to_string());
        let array = StringArray::from(vec!["2024-01-15", "2024-01-15 10:30:00", "2024"]);
        assert_eq!(check.first_violation(&array).unwrap(), None);
    }

    #[test]
    fn test_first_invalid_date_reported() {
        let check = DateTypeCheck::new("created_at".to_string());
        let array = StringArray::from(vec!["2024-01-15", "yesterday", "later"]);
        assert_eq!(check.first_violation(&array).unwrap(), Some(1));
    }
}
