use std::fmt;

/// Declared type of a schema column.
///
/// Names are matched case-insensitively. Anything outside the four known
/// types is kept as `Unknown` so that validation can report it instead of
/// failing at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Integer,
    String,
    Float,
    Datetime,
    Unknown(String),
}

impl DataType {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        match lowered.as_str() {
            "integer" => DataType::Integer,
            "string" => DataType::String,
            "float" => DataType::Float,
            "datetime" => DataType::Datetime,
            _ => DataType::Unknown(lowered),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DataType::Integer => "integer",
            DataType::String => "string",
            DataType::Float => "float",
            DataType::Datetime => "datetime",
            DataType::Unknown(name) => name.as_str(),
        }
    }
}

impl From<&str> for DataType {
    fn from(raw: &str) -> Self {
        DataType::parse(raw)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One expected column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column_name: String,
    pub data_type: DataType,
}

impl ColumnSpec {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<DataType>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Ordered column definitions for one table.
///
/// Column `i` of the schema corresponds to CSV column `i`; names are only
/// used for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table_name: String,
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Create an empty schema for `table_name`
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    pub fn from_columns(table_name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Append a column
    pub fn with_column(mut self, name: impl Into<String>, data_type: impl Into<DataType>) -> Self {
        self.columns.push(ColumnSpec::new(name, data_type));
        self
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.with_column(name, DataType::Integer)
    }

    pub fn string(self, name: impl Into<String>) -> Self {
        self.with_column(name, DataType::String)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.with_column(name, DataType::Float)
    }

    pub fn datetime(self, name: impl Into<String>) -> Self {
        self.with_column(name, DataType::Datetime)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse_is_case_insensitive() {
        assert_eq!(DataType::parse("INTEGER"), DataType::Integer);
        assert_eq!(DataType::parse("Float"), DataType::Float);
        assert_eq!(DataType::parse("string"), DataType::String);
        assert_eq!(DataType::parse("DateTime"), DataType::Datetime);
    }

    #[test]
    fn test_unknown_data_type_is_kept_lowercased() {
        let dt = DataType::parse("Boolean");
        assert_eq!(dt, DataType::Unknown("boolean".to_string()));
        assert_eq!(dt.to_string(), "boolean");
    }

    #[test]
    fn test_schema_builder_keeps_order() {
        let schema = Schema::new("orders")
            .integer("id")
            .string("customer")
            .float("amount")
            .datetime("created_at");

        assert_eq!(schema.table_name(), "orders");
        assert_eq!(schema.len(), 4);
        let names: Vec<&str> = schema
            .columns()
            .iter()
            .map(|c| c.column_name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "customer", "amount", "created_at"]);
        assert_eq!(schema.columns()[3].data_type, DataType::Datetime);
    }

    #[test]
    fn test_empty_schema() {
        let schema = Schema::new("unknown");
        assert!(schema.is_empty());
        assert_eq!(schema.len(), 0);
    }
}
