use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use object_store::{path::Path, ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::errors::StorageError;

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Object key of an upload: `{table_name}/{YYYYMMDD_HHMMSS}.csv`.
pub fn object_key<Tz: TimeZone>(table_name: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}/{}.csv", table_name, at.format("%Y%m%d_%H%M%S"))
}

/// Bucket management for backends whose data-plane client cannot create
/// buckets itself.
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;
    /// Create `bucket`; a bucket that already exists and is ours is not an error.
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;
}

/// Bucket-scoped handle on an object store.
///
/// The underlying client is shared; cloning the `Arc` is all it costs to
/// hand the same store to another component.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    write_timeout: Duration,
    admin: Option<Arc<dyn BucketAdmin>>,
}

impl ObjectStorage {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            admin: None,
        }
    }

    pub fn with_bucket_admin(self, admin: Arc<dyn BucketAdmin>) -> Self {
        Self {
            admin: Some(admin),
            ..self
        }
    }

    pub fn with_write_timeout(self, write_timeout: Duration) -> Self {
        Self {
            write_timeout,
            ..self
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket if it is absent, then check that it answers a
    /// listing request.
    ///
    /// Idempotent. Without a [`BucketAdmin`] the backend is expected to
    /// have created the bucket when the store was built, and only the
    /// listing check runs. Meant to run once at startup.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if let Some(admin) = &self.admin {
            if admin.bucket_exists(&self.bucket).await? {
                debug!(bucket = %self.bucket, "Bucket already exists");
            } else {
                admin.create_bucket(&self.bucket).await?;
                info!("Bucket '{}' created successfully", self.bucket);
            }
        }

        match self.store.list_with_delimiter(None).await {
            Ok(listing) => {
                debug!(
                    bucket = %self.bucket,
                    prefixes = listing.common_prefixes.len(),
                    "Bucket is reachable"
                );
                Ok(())
            }
            Err(e) => Err(StorageError::BucketUnavailable {
                bucket: self.bucket.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Store `bytes` under `key` in a single put.
    ///
    /// A single put is applied atomically by every backend: either the whole
    /// object becomes visible or nothing does.
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = Path::parse(key).map_err(|e| StorageError::InvalidKey {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let size = bytes.len();
        match tokio::time::timeout(
            self.write_timeout,
            self.store.put(&path, PutPayload::from(bytes)),
        )
        .await
        {
            Ok(Ok(_)) => {
                info!(bucket = %self.bucket, key, size, "Stored object");
                Ok(())
            }
            Ok(Err(e)) => Err(StorageError::ObjectStore(e)),
            Err(_) => Err(StorageError::Timeout {
                key: key.to_string(),
                secs: self.write_timeout.as_secs(),
            }),
        }
    }

    /// Read back the object stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Path::parse(key).map_err(|e| StorageError::InvalidKey {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}
