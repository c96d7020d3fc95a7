pub mod column;
pub mod errors;
pub mod pipeline;
pub mod registry;
pub mod results;
pub mod rules;
pub mod storage;
pub mod tables;
pub mod utils;
pub mod validator;

pub use column::{ColumnSpec, DataType, Schema};
pub use errors::{ErrorKind, IngestError, StorageError, StoreError};
pub use pipeline::{IngestionPipeline, IngestionResult, Stage, Upload};
pub use registry::{InMemorySchemaStore, RetryPolicy, SchemaRegistry, SchemaStore};
pub use results::ValidationVerdict;
pub use storage::{object_key, BucketAdmin, ObjectStorage};
pub use tables::{csv_table::decode_csv, RawTable};
pub use validator::SchemaValidator;
