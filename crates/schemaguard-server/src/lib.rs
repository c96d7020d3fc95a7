pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod logging;
pub mod mysql;
pub mod storage;

pub use api::{router, AppState};
pub use auth::{AuthProvider, MySqlAuthProvider};
pub use config::ServerConfig;
pub use errors::ConfigError;
