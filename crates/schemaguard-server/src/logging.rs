use clap::ValueEnum;
use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// JSON Lines, one object per event
    Json,
}

/// Dependencies whose `info` output drowns out ours.
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("sqlx", "warn"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("reqwest", "warn"),
    ("object_store", "warn"),
];

/// Build the event filter.
///
/// A non-empty `rust_log` (the `RUST_LOG` value) replaces everything else.
/// Otherwise `level` is the base directive with the noisy targets capped.
pub fn build_env_filter(level: &str, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    let filter_str = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => directives.to_string(),
        None => {
            let mut directives = vec![level.to_string()];
            for (target, lvl) in NOISY_TARGETS {
                directives.push(format!("{}={}", target, lvl));
            }
            directives.join(",")
        }
    };
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_env_filter(level, rust_log.as_deref())?;

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install the tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_caps_noisy_targets() {
        let filter = build_env_filter("info", None).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("object_store=warn"));
    }

    #[test]
    fn test_rust_log_replaces_defaults() {
        let filter = build_env_filter("info", Some("schemaguard_core=trace")).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("schemaguard_core=trace"));
        assert!(!rendered.contains("sqlx"));
    }

    #[test]
    fn test_blank_rust_log_is_ignored() {
        let filter = build_env_filter("debug", Some("  ")).unwrap();
        assert!(filter.to_string().contains("hyper=warn"));
    }

    #[test]
    fn test_invalid_level_is_an_error() {
        assert!(build_env_filter("schemaguard=loud", None).is_err());
    }
}
