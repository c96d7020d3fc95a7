use async_trait::async_trait;
use schemaguard_core::StoreError;
use sqlx::mysql::MySqlPool;
use tracing::warn;

use crate::mysql::store_error;

const PASSWORD_QUERY: &str = "SELECT password FROM users WHERE username = ?";

/// Checks a username and password pair.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(false)` for an unknown user or a wrong password; `Err` only when
    /// the credential store itself fails.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError>;
}

/// Credentials from the `users` table, stored as bcrypt hashes.
pub struct MySqlAuthProvider {
    pool: MySqlPool,
}

impl MySqlAuthProvider {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthProvider for MySqlAuthProvider {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(PASSWORD_QUERY)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        match row {
            Some((hash,)) => verify_password(password, &hash).await,
            None => Ok(false),
        }
    }
}

/// Verify `password` against a bcrypt `hash` on the blocking pool.
///
/// A malformed stored hash is logged and treated as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    let password = password.to_string();
    let hash = hash.to_string();

    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| StoreError::Query(format!("Task join error: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("Stored password hash could not be checked: {}", e);
            Ok(false)
        }
    }
}
