//! Schema lookups against the schema store.
//!
//! The registry wraps a [`SchemaStore`] with a bounded, fixed-delay retry.
//! When the budget is spent the public lookups degrade to an empty answer
//! instead of failing; the `try_*` variants expose the underlying
//! [`IngestError::RegistryUnavailable`].

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::column::{ColumnSpec, Schema};
use crate::errors::{IngestError, StoreError};

/// Source of expected schemas, keyed by table name.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Ordered column definitions of `table_name`, empty when the table is unknown.
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSpec>, StoreError>;
    /// Every table name the store knows about.
    async fn fetch_table_names(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
    retry: RetryPolicy,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Expected schema of `table_name`.
    ///
    /// Unknown tables and an unreachable store both yield an empty schema.
    pub async fn lookup(&self, table_name: &str) -> Schema {
        match self.try_lookup(table_name).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(kind = e.kind().as_str(), table = table_name, "{}; using an empty schema", e);
                Schema::new(table_name)
            }
        }
    }

    pub async fn try_lookup(&self, table_name: &str) -> Result<Schema, IngestError> {
        let columns = self
            .with_retry("fetching the expected schema", || {
                self.store.fetch_columns(table_name)
            })
            .await?;
        debug!(table = table_name, columns = columns.len(), "Fetched expected schema");
        Ok(Schema::from_columns(table_name, columns))
    }

    /// Distinct table names known to the store, empty if it is unreachable.
    pub async fn list_table_names(&self) -> BTreeSet<String> {
        match self.try_list_table_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!(kind = e.kind().as_str(), "{}; listing no tables", e);
                BTreeSet::new()
            }
        }
    }

    pub async fn try_list_table_names(&self) -> Result<BTreeSet<String>, IngestError> {
        let names = self
            .with_retry("listing table names", || self.store.fetch_table_names())
            .await?;
        Ok(names.into_iter().collect())
    }

    async fn with_retry<T, F, Fut>(&self, action: &str, op: F) -> Result<T, IngestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < attempts {
                        warn!(
                            attempt,
                            attempts,
                            "Schema store error while {}: {}. Retrying in {:?}...",
                            action,
                            e,
                            self.retry.delay
                        );
                        tokio::time::sleep(self.retry.delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }
        error!(
            "Failed to reach the schema store after {} attempts while {}",
            attempts, action
        );
        Err(IngestError::RegistryUnavailable(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }
}

/// Schema store held in memory, for tests and storage-less runs.
#[derive(Default)]
pub struct InMemorySchemaStore {
    tables: RwLock<BTreeMap<String, Vec<ColumnSpec>>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, schema: Schema) -> Self {
        self.insert(schema);
        self
    }

    /// Add or replace the columns of `schema`'s table.
    pub fn insert(&self, schema: Schema) {
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables.insert(schema.table_name().to_string(), schema.columns().to_vec());
    }
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSpec>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(tables.get(table_name).cloned().unwrap_or_default())
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(tables.keys().cloned().collect())
    }
}
