use arrow::{
    array::Array,
    compute::{self},
    datatypes::DataType,
    error::ArrowError,
};
use arrow_array::StringArray;

use crate::rules::TypeRule;

/// Numeric conformance via Arrow's safe cast: a cell that does not parse
/// becomes null in the casted array.
pub struct TypeCheck {
    column: String,
    expected: DataType,
}

impl TypeCheck {
    pub fn new(column: String, expected: DataType) -> Self {
        Self { column, expected }
    }

    pub fn integer(column: String) -> Self {
        Self::new(column, DataType::Int64)
    }

    pub fn float(column: String) -> Self {
        Self::new(column, DataType::Float64)
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl TypeRule for TypeCheck {
    fn name(&self) -> &'static str {
        "TypeCheck"
    }

    fn first_violation(&self, array: &StringArray) -> Result<Option<usize>, ArrowError> {
        // Surrounding whitespace is tolerated, the numeric parsers are not.
        let trimmed: StringArray = array.iter().map(|v| v.map(str::trim)).collect();
        let casted = compute::cast(&trimmed, &self.expected)?;
        // Absent cells are null before the cast and count as violations too.
        Ok((0..casted.len()).find(|&i| casted.is_null(i)))
    }
}

/// String columns accept any value; only an absent cell fails.
pub struct PresenceCheck {}

impl PresenceCheck {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for PresenceCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRule for PresenceCheck {
    fn name(&self) -> &'static str {
        "PresenceCheck"
    }

    fn first_violation(&self, array: &StringArray) -> Result<Option<usize>, ArrowError> {
        Ok((0..array.len()).find(|&i| array.is_null(i)))
    }
}
