//! Schema validation of decoded CSV rows.
//!
//! The validator checks the shape of the data (column count of the first
//! row) and then walks the schema column by column, checking every row of
//! a column before moving on. The first non-conforming cell ends the run;
//! there is no collect-all mode.

pub mod validation;

pub use validation::SchemaValidator;
