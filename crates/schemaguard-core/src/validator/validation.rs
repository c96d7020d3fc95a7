use tracing::{error, info, warn};

use crate::column::Schema;
use crate::results::ValidationVerdict;
use crate::rules::compile_type_rule;
use crate::tables::RawTable;

/// Checks decoded rows against an expected schema.
///
/// Stateless; one instance can be shared across requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `rows` against `schema`.
    ///
    /// # Order
    ///
    /// Columns are visited in schema order and, within a column, rows in
    /// document order. When several cells are invalid this decides which
    /// one is reported.
    ///
    /// # Returns
    ///
    /// A passed verdict with message `"ok"`, or a failed verdict naming the
    /// column, the 1-based data row, the expected type and the raw value.
    pub fn validate(&self, rows: &RawTable, schema: &Schema) -> ValidationVerdict {
        // An empty table passes the shape check vacuously.
        if let Some(width) = rows.width() {
            if width != schema.len() {
                let msg = format!(
                    "Number of columns does not match expected schema. Expected: {}, Got: {}",
                    schema.len(),
                    width
                );
                error!("{}", msg);
                return ValidationVerdict::failed(msg);
            }
        }

        for (j, column) in schema.columns().iter().enumerate() {
            let Some(rule) = compile_type_rule(&column.column_name, &column.data_type) else {
                let msg = format!("Unknown data type: {}", column.data_type);
                warn!("{}", msg);
                return ValidationVerdict::failed(msg);
            };

            let array = rows.column(j);
            match rule.first_violation(&array) {
                Ok(None) => {}
                Ok(Some(i)) => {
                    let msg = format!(
                        "Column '{}', Row {}: Expected {}, got {}.",
                        column.column_name,
                        i + 1,
                        column.data_type,
                        render_cell(rows.cell(i, j))
                    );
                    error!("{}", msg);
                    return ValidationVerdict::failed(msg);
                }
                Err(e) => {
                    let msg = format!("Schema validation error: {}", e);
                    error!("{}", msg);
                    return ValidationVerdict::failed(msg);
                }
            }
        }

        info!("Data schema validation successful.");
        ValidationVerdict::passed()
    }
}

fn render_cell(cell: Option<&str>) -> String {
    match cell {
        Some(value) => format!("'{}'", value),
        None => "nothing".to_string(),
    }
}
