use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading coordinator configuration.
///
/// The dispatch path itself has no error type: anomalies there degrade to
/// logged no-ops.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
