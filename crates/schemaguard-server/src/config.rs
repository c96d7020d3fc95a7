//! Server configuration.
//!
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file, then the deployment environment variables (`MYSQL_*`, `MINIO_*`,
//! `S3_BUCKET_NAME`). Command-line flags are applied last by `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use schemaguard_core::pipeline::DEFAULT_MAX_UPLOAD_BYTES;
use schemaguard_core::RetryPolicy;
use serde::Deserialize;

use crate::errors::ConfigError;
use crate::logging::LogFormat;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
    pub mysql: MySqlConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            mysql: MySqlConfig::default(),
            storage: StorageConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "db".to_string(),
            port: 3306,
            user: "readonly".to_string(),
            password: "readonly".to_string(),
            database: "data_ingestion".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3 or an S3-compatible server such as MinIO
    #[default]
    S3,
    /// A directory on local disk
    Local,
    /// Process memory, lost on exit
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub local_root: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: "storage:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "csv-file-uploader".to_string(),
            region: "us-east-1".to_string(),
            local_root: PathBuf::from("./data"),
            request_timeout_secs: 60,
        }
    }
}

impl StorageConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            delay_secs: policy.delay.as_secs(),
        }
    }
}

impl RegistryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Parse a TOML document; missing keys take their defaults.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

impl ServerConfig {
    /// Override file values with the deployment environment.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };
        set(&mut self.mysql.host, "MYSQL_HOST");
        set(&mut self.mysql.user, "MYSQL_USER");
        set(&mut self.mysql.password, "MYSQL_PASSWORD");
        set(&mut self.mysql.database, "MYSQL_DATABASE");
        set(&mut self.storage.endpoint, "MINIO_ENDPOINT");
        set(&mut self.storage.access_key, "MINIO_ACCESS_KEY");
        set(&mut self.storage.secret_key, "MINIO_SECRET_KEY");
        set(&mut self.storage.bucket, "S3_BUCKET_NAME");
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "must be greater than zero"));
        }
        if self.registry.attempts == 0 {
            return Err(invalid("registry.attempts", "must be at least 1"));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(invalid("storage.bucket", "must not be empty"));
        }
        if self.storage.request_timeout_secs == 0 {
            return Err(invalid(
                "storage.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.mysql.max_connections == 0 {
            return Err(invalid("mysql.max_connections", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Resolve the full configuration from `path` (if any) and the process environment.
pub fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_config(&content)?
        }
        None => ServerConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0:8000");
        assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
        assert_eq!(config.mysql.host, "db");
        assert_eq!(config.mysql.user, "readonly");
        assert_eq!(config.mysql.database, "data_ingestion");
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.endpoint, "storage:9000");
        assert_eq!(config.storage.bucket, "csv-file-uploader");
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.registry.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
bind = "127.0.0.1:9000"

[storage]
backend = "local"
local_root = "/tmp/uploads"

[registry]
attempts = 2
delay_secs = 0
"#,
        )
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.local_root, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.storage.bucket, "csv-file-uploader");
        assert_eq!(
            config.registry.retry_policy(),
            RetryPolicy::new(2, Duration::ZERO)
        );
        assert_eq!(config.mysql.port, 3306);
    }

    #[test]
    fn test_log_format_from_file() {
        let config = parse_config("[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = parse_config("[storage]\nbackend = \"ftp\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut config = parse_config("[mysql]\nhost = \"from-file\"\nuser = \"file-user\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("MYSQL_HOST", "mysql.internal"),
            ("MINIO_ENDPOINT", "minio:9000"),
            ("S3_BUCKET_NAME", "uploads"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mysql.host, "mysql.internal");
        // Not set in the environment, so the file value stays.
        assert_eq!(config.mysql.user, "file-user");
        assert_eq!(config.storage.endpoint, "minio:9000");
        assert_eq!(config.storage.bucket, "uploads");
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ServerConfig::default();
        config.max_upload_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "max_upload_bytes"
        ));

        let mut config = ServerConfig::default();
        config.registry.attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.storage.bucket = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_upload_bytes = 1024").unwrap();
        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
