use thiserror::Error;

/// Stable name of an ingestion failure, used for logging and HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidTableName,
    PayloadTooLarge,
    UnsupportedMediaType,
    DecodeError,
    SchemaMismatch,
    StorageError,
    RegistryUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTableName => "InvalidTableName",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::UnsupportedMediaType => "UnsupportedMediaType",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::SchemaMismatch => "SchemaMismatch",
            ErrorKind::StorageError => "StorageError",
            ErrorKind::RegistryUnavailable => "RegistryUnavailable",
        }
    }

    /// Whether the failure is the uploader's fault (bad file) rather than ours.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidTableName
                | ErrorKind::PayloadTooLarge
                | ErrorKind::UnsupportedMediaType
                | ErrorKind::DecodeError
                | ErrorKind::SchemaMismatch
        )
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    /// Table name cannot be used as the first segment of an object key
    #[error("Invalid table name '{0}': expected a single non-empty path segment")]
    InvalidTableName(String),

    /// Upload exceeds the configured payload limit
    #[error("File size too large: {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Declared content type is not one of the accepted CSV types
    #[error("Invalid file type: '{0}'")]
    UnsupportedMediaType(String),

    /// Upload is not valid UTF-8 or not parseable as CSV
    #[error("CSV error: {0}")]
    DecodeError(String),

    /// Rows do not conform to the table schema, carries the verdict message verbatim
    #[error("{0}")]
    SchemaMismatch(String),

    /// Object store rejected or timed out the write
    #[error("Error uploading file to S3: {0}")]
    StorageError(#[from] StorageError),

    /// Schema store could not be reached within the retry budget
    #[error("Schema store unavailable: {0}")]
    RegistryUnavailable(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::InvalidTableName(_) => ErrorKind::InvalidTableName,
            IngestError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            IngestError::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            IngestError::DecodeError(_) => ErrorKind::DecodeError,
            IngestError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            IngestError::StorageError(_) => ErrorKind::StorageError,
            IngestError::RegistryUnavailable(_) => ErrorKind::RegistryUnavailable,
        }
    }
}

/// Failures of a relational store (schema lookups, credential lookups).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Query(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("invalid object key '{key}': {message}")]
    InvalidKey { key: String, message: String },

    #[error("write of '{key}' timed out after {secs}s")]
    Timeout { key: String, secs: u64 },

    #[error("bucket '{bucket}' is not reachable: {message}")]
    BucketUnavailable { bucket: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_and_server_kinds() {
        assert!(ErrorKind::InvalidTableName.is_client_error());
        assert!(ErrorKind::PayloadTooLarge.is_client_error());
        assert!(ErrorKind::UnsupportedMediaType.is_client_error());
        assert!(ErrorKind::DecodeError.is_client_error());
        assert!(ErrorKind::SchemaMismatch.is_client_error());
        assert!(!ErrorKind::StorageError.is_client_error());
        assert!(!ErrorKind::RegistryUnavailable.is_client_error());
    }

    #[test]
    fn test_schema_mismatch_message_is_verbatim() {
        let err = IngestError::SchemaMismatch("Column 'x', Row 2: Expected integer, got 'foo'.".into());
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert_eq!(
            err.to_string(),
            "Column 'x', Row 2: Expected integer, got 'foo'."
        );
    }

    #[test]
    fn test_storage_error_converts_to_ingest_error() {
        let err: IngestError = StorageError::Timeout {
            key: "orders/20240101_000000.csv".into(),
            secs: 60,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StorageError);
        assert!(err.to_string().starts_with("Error uploading file to S3"));
    }
}
