//! Object-store construction.
//!
//! The client is built once per process and shared; every caller of
//! [`object_store`] gets a clone of the same `Arc`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ClientOptions, ObjectStore};
use once_cell::sync::OnceCell;
use schemaguard_core::{BucketAdmin, StorageError};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

static OBJECT_STORE: OnceCell<Arc<dyn ObjectStore>> = OnceCell::new();

/// Process-wide object store, built from `config` on first call.
pub fn object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    OBJECT_STORE
        .get_or_try_init(|| build_object_store(config))
        .map(Arc::clone)
}

pub fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.backend {
        StorageBackend::S3 => build_s3(config),
        StorageBackend::Local => build_local(config),
        StorageBackend::Memory => {
            info!("Using in-memory object store; uploads are lost on exit");
            Ok(Arc::new(InMemory::new()))
        }
    }
}

fn build_s3(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let endpoint = normalize_endpoint(&config.endpoint);
    let client_options = ClientOptions::new()
        .with_timeout(config.request_timeout())
        .with_connect_timeout(CONNECT_TIMEOUT);

    let store = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region)
        .with_endpoint(&endpoint)
        .with_allow_http(endpoint.starts_with("http://"))
        .with_virtual_hosted_style_request(false)
        .with_access_key_id(&config.access_key)
        .with_secret_access_key(&config.secret_key)
        .with_client_options(client_options)
        .build()?;
    info!(endpoint = %endpoint, bucket = %config.bucket, "Using S3 object store");
    Ok(Arc::new(store))
}

fn build_local(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    // The bucket is a sub-directory of the root, created if absent.
    let root = config.local_root.join(&config.bucket);
    std::fs::create_dir_all(&root)?;
    let store = LocalFileSystem::new_with_prefix(&root)?;
    info!(root = %root.display(), "Using local object store");
    Ok(Arc::new(store))
}

/// Bucket admin for the configured backend; only S3 needs one.
pub fn build_bucket_admin(config: &StorageConfig) -> Option<Arc<dyn BucketAdmin>> {
    match config.backend {
        StorageBackend::S3 => Some(Arc::new(S3BucketAdmin::new(config))),
        StorageBackend::Local | StorageBackend::Memory => None,
    }
}

/// Creates buckets through the S3 control API, which `object_store` does not cover.
pub struct S3BucketAdmin {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3BucketAdmin {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "schemaguard-config",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(normalize_endpoint(&config.endpoint))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }
}

fn bucket_unavailable(bucket: &str, message: String) -> StorageError {
    StorageError::BucketUnavailable {
        bucket: bucket.to_string(),
        message,
    }
}

#[async_trait]
impl BucketAdmin for S3BucketAdmin {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(bucket_unavailable(
                bucket,
                DisplayErrorContext(&e).to_string(),
            )),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 is the default location and must not be named explicitly.
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        match request.send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => Err(bucket_unavailable(
                bucket,
                DisplayErrorContext(&e).to_string(),
            )),
        }
    }
}

/// MinIO endpoints are usually given as `host:port`; default to plain HTTP.
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("storage:9000"), "http://storage:9000");
        assert_eq!(
            normalize_endpoint("https://s3.amazonaws.com"),
            "https://s3.amazonaws.com"
        );
        assert_eq!(normalize_endpoint("http://minio:9000"), "http://minio:9000");
    }

    #[test]
    fn test_s3_builds_without_network() {
        let config = StorageConfig::default();
        assert!(build_object_store(&config).is_ok());
    }

    #[tokio::test]
    async fn test_local_backend_creates_bucket_directory() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Local,
            local_root: dir.path().to_path_buf(),
            bucket: "uploads".to_string(),
            ..StorageConfig::default()
        };

        let store = build_object_store(&config).unwrap();
        assert!(dir.path().join("uploads").is_dir());

        store
            .put(&Path::from("orders/20240115_103005.csv"), Bytes::from_static(b"id\n1\n").into())
            .await
            .unwrap();
        assert!(dir
            .path()
            .join("uploads/orders/20240115_103005.csv")
            .exists());
    }

    #[tokio::test]
    async fn test_bucket_admin_only_for_s3() {
        assert!(build_bucket_admin(&StorageConfig::default()).is_some());
        for backend in [StorageBackend::Local, StorageBackend::Memory] {
            let config = StorageConfig {
                backend,
                ..StorageConfig::default()
            };
            assert!(build_bucket_admin(&config).is_none());
        }
    }

    #[tokio::test]
    async fn test_bucket_admin_reports_unreachable_endpoint() {
        // Nothing listens on port 1, so the existence check fails instead of
        // reporting a missing bucket that would then be created.
        let config = StorageConfig {
            endpoint: "127.0.0.1:1".to_string(),
            ..StorageConfig::default()
        };
        let admin = S3BucketAdmin::new(&config);
        let err = admin.bucket_exists("csv-file-uploader").await.unwrap_err();
        assert!(matches!(err, StorageError::BucketUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let store = build_object_store(&config).unwrap();
        assert!(store.list_with_delimiter(None).await.is_ok());
    }
}
