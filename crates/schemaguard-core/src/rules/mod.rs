use arrow::error::ArrowError;
use arrow_array::StringArray;

use crate::column::DataType;

pub mod date;
pub mod generic;

pub use date::DateTypeCheck;
pub use generic::{PresenceCheck, TypeCheck};

/// A per-column conformance check over raw string cells.
pub trait TypeRule: Send + Sync {
    /// Returns the name of the rule.
    fn name(&self) -> &'static str;
    /// Index of the first cell that does not conform, in row order.
    fn first_violation(&self, array: &StringArray) -> Result<Option<usize>, ArrowError>;
}

/// Pick the check for a declared column type, `None` when the type is unknown.
pub fn compile_type_rule(column: &str, data_type: &DataType) -> Option<Box<dyn TypeRule>> {
    match data_type {
        DataType::Integer => Some(Box::new(TypeCheck::integer(column.to_string()))),
        DataType::Float => Some(Box::new(TypeCheck::float(column.to_string()))),
        DataType::String => Some(Box::new(PresenceCheck::new())),
        DataType::Datetime => Some(Box::new(DateTypeCheck::new(column.to_string()))),
        DataType::Unknown(_) => None,
    }
}
