//! Upload-to-store lifecycle.
//!
//! ```text
//! Received → SizeChecked → TypeChecked → Decoded → SchemaValidated → Stored
//! ```
//!
//! Stages run in order and never branch back. The first failing stage ends
//! the request with its error kind; nothing is stored unless every earlier
//! stage passed.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local};
use object_store::path::Path;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::errors::IngestError;
use crate::registry::SchemaRegistry;
use crate::storage::{object_key, ObjectStorage};
use crate::tables::csv_table::decode_csv;
use crate::validator::SchemaValidator;

/// 200 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Declared content types accepted as CSV. The second is what browsers send
/// for `.csv` files on machines with Excel installed.
pub const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["text/csv", "application/vnd.ms-excel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    SizeChecked,
    TypeChecked,
    Decoded,
    SchemaValidated,
    Stored,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A fully buffered upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub table_name: String,
    pub content_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionResult {
    pub stored_key: String,
    pub original_filename: String,
}

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

pub struct IngestionPipeline {
    registry: Arc<SchemaRegistry>,
    storage: Arc<ObjectStorage>,
    validator: SchemaValidator,
    max_upload_bytes: usize,
    clock: Clock,
}

impl IngestionPipeline {
    pub fn new(registry: Arc<SchemaRegistry>, storage: Arc<ObjectStorage>) -> Self {
        Self {
            registry,
            storage,
            validator: SchemaValidator::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            clock: Arc::new(Local::now),
        }
    }

    pub fn with_max_upload_bytes(self, max_upload_bytes: usize) -> Self {
        Self {
            max_upload_bytes,
            ..self
        }
    }

    /// Replace the clock used to timestamp object keys.
    pub fn with_clock(self, clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate `upload` against its table's schema and store it.
    ///
    /// # Returns
    ///
    /// * `Ok(IngestionResult)` - The bytes are stored, unmodified, under the returned key
    /// * `Err(IngestError)` - The first failing stage's error; nothing was stored
    pub async fn ingest(&self, upload: Upload) -> Result<IngestionResult, IngestError> {
        let span = info_span!(
            "ingest",
            table = %upload.table_name,
            filename = %upload.filename
        );
        async move {
            let result = self.run(upload).await;
            match &result {
                Ok(r) => info!(key = %r.stored_key, "Upload stored"),
                Err(e) => warn!(kind = e.kind().as_str(), "Upload rejected: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, upload: Upload) -> Result<IngestionResult, IngestError> {
        let Upload {
            bytes,
            table_name,
            content_type,
            filename,
        } = upload;
        debug!(stage = %Stage::Received, size = bytes.len());

        check_table_name(&table_name)?;
        check_size(bytes.len(), self.max_upload_bytes)?;
        debug!(stage = %Stage::SizeChecked);

        check_content_type(&content_type)?;
        debug!(stage = %Stage::TypeChecked);

        let rows = decode_csv(&bytes)?;
        debug!(stage = %Stage::Decoded, rows = rows.len());

        let schema = self.registry.lookup(&table_name).await;
        let verdict = self.validator.validate(&rows, &schema);
        if !verdict.is_passed() {
            return Err(IngestError::SchemaMismatch(verdict.into_message()));
        }
        drop(rows);
        debug!(stage = %Stage::SchemaValidated);

        let stored_key = object_key(&table_name, &(self.clock)());
        self.storage.put(&stored_key, bytes).await?;
        info!(
            "File '{}' uploaded to '{}/{}' successfully",
            stored_key.rsplit('/').next().unwrap_or(&stored_key),
            self.storage.bucket(),
            table_name
        );
        debug!(stage = %Stage::Stored);

        Ok(IngestionResult {
            stored_key,
            original_filename: filename,
        })
    }
}

/// Accept only names that form exactly one object-key segment, so the
/// stored key always starts with `{table_name}/`.
pub fn check_table_name(table_name: &str) -> Result<(), IngestError> {
    let single_segment = Path::parse(table_name)
        .map(|path| path.as_ref() == table_name && path.parts().count() == 1)
        .unwrap_or(false);
    if single_segment {
        Ok(())
    } else {
        Err(IngestError::InvalidTableName(table_name.to_string()))
    }
}

/// Reject payloads larger than `limit`; exactly `limit` bytes is accepted.
pub fn check_size(size: usize, limit: usize) -> Result<(), IngestError> {
    if size > limit {
        return Err(IngestError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

/// Accept only the CSV content types, ignoring parameters and case.
pub fn check_content_type(content_type: &str) -> Result<(), IngestError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(IngestError::UnsupportedMediaType(content_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_size_boundary() {
        assert!(check_size(DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        let err = check_size(DEFAULT_MAX_UPLOAD_BYTES + 1, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    }

    #[test]
    fn test_default_limit_is_200_mib() {
        assert_eq!(DEFAULT_MAX_UPLOAD_BYTES, 209_715_200);
    }

    #[test]
    fn test_accepted_content_types() {
        assert!(check_content_type("text/csv").is_ok());
        assert!(check_content_type("application/vnd.ms-excel").is_ok());
        assert!(check_content_type("text/csv; charset=utf-8").is_ok());
        assert!(check_content_type("Text/CSV").is_ok());
    }

    #[test]
    fn test_rejected_content_types() {
        for ct in ["application/json", "text/plain", "", "application/octet-stream"] {
            let err = check_content_type(ct).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedMediaType);
        }
    }

    #[test]
    fn test_table_name_accepts_plain_names() {
        for name in ["orders", "sales_2024", "Kunden-Daten", "t"] {
            assert!(check_table_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_table_name_rejects_non_segments() {
        for name in ["", "/", "orders/", "/orders", "a/b", "..", ".", "a//b"] {
            let err = check_table_name(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTableName, "{name:?}");
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::SchemaValidated.to_string(), "SchemaValidated");
    }
}
