use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use schemaguard_core::{IngestionPipeline, ObjectStorage, SchemaRegistry};
use schemaguard_server::logging::{self, LogFormat};
use schemaguard_server::mysql::{self, MySqlSchemaStore};
use schemaguard_server::{config, router, storage, AppState, MySqlAuthProvider};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "schemaguard",
    version,
    about = "SchemaGuard - CSV ingestion service with schema validation",
    long_about = "SchemaGuard accepts CSV uploads over HTTP, validates every cell against the \
                  expected schema of the target table and stores accepted files in an object \
                  store.\n\n\
                  Example usage:\n  \
                  schemaguard --config schemaguard.toml --log-format json"
)]
struct Args {
    /// Path to a TOML configuration file; defaults and environment variables apply without one
    #[arg(short, long, value_name = "FILE", env = "SCHEMAGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `bind` from the config file
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Log line format, overrides `logging.format` from the config file
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Enable debug logging and detailed error backtraces
    #[arg(short, long)]
    debug: bool,
}

async fn run(args: Args) -> Result<()> {
    let mut config = config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    logging::init_logging(&config.logging.level, config.logging.format)?;

    let pool = mysql::connect_pool(&config.mysql);
    let registry = Arc::new(
        SchemaRegistry::new(Arc::new(MySqlSchemaStore::new(pool.clone())))
            .with_retry_policy(config.registry.retry_policy()),
    );

    let store = storage::object_store(&config.storage).context("Failed to build the object store")?;
    let mut objects = ObjectStorage::new(store, config.storage.bucket.clone())
        .with_write_timeout(config.storage.request_timeout());
    if let Some(admin) = storage::build_bucket_admin(&config.storage) {
        objects = objects.with_bucket_admin(admin);
    }
    let objects = Arc::new(objects);
    objects
        .ensure_bucket()
        .await
        .with_context(|| format!("Bucket '{}' is not available", config.storage.bucket))?;

    let pipeline = Arc::new(
        IngestionPipeline::new(registry.clone(), objects)
            .with_max_upload_bytes(config.max_upload_bytes),
    );
    let state = AppState {
        pipeline,
        registry,
        auth: Arc::new(MySqlAuthProvider::new(pool)),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "Listening on {} (bucket '{}', upload limit {} bytes)",
        listener.local_addr()?,
        config.storage.bucket,
        config.max_upload_bytes
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Enable backtraces in debug mode
    if args.debug {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    if let Err(err) = run(args).await {
        if std::env::var("RUST_BACKTRACE").is_ok() {
            eprintln!("Error: {:?}", err);
        } else {
            eprintln!("Error: {:#}", err);
            eprintln!("\nHint: Run with --debug flag for detailed stack traces");
        }
        std::process::exit(1);
    }
}
