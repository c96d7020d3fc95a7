//! MySQL-backed schema store using sqlx

use std::time::Duration;

use async_trait::async_trait;
use schemaguard_core::{ColumnSpec, SchemaStore, StoreError};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::MySqlConfig;

const COLUMNS_QUERY: &str =
    "SELECT column_name, data_type FROM expected_schema WHERE table_name = ?";
const TABLE_NAMES_QUERY: &str = "SELECT DISTINCT table_name FROM expected_schema";

/// Build the connection pool without connecting.
///
/// Connections are opened on first use, so a database that is still
/// starting up does not prevent the server from starting; the registry's
/// retry policy absorbs the wait.
pub fn connect_pool(config: &MySqlConfig) -> MySqlPool {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy_with(options)
}

/// Classify a sqlx failure: transport problems are connection errors,
/// everything else is a query error.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

pub struct MySqlSchemaStore {
    pool: MySqlPool,
}

impl MySqlSchemaStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for MySqlSchemaStore {
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSpec>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(COLUMNS_QUERY)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type)| ColumnSpec::new(name, data_type.as_str()))
            .collect())
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(TABLE_NAMES_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}
