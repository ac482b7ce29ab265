//! Coordinator configuration.
//!
//! Loaded from TOML or from the environment:
//! - `TRIBUTARY_LABEL`: coordinator label used in logs and topology snapshots
//! - `TRIBUTARY_MODE`: `dev` (default) or `prod`/`production`
//!
//! `prod` turns off per-dispatch spans and unmatched-command logs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deployment mode read from `TRIBUTARY_MODE`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Mode {
    #[default]
    Dev,
    Prod,
}

impl Mode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Mode::Dev),
            "prod" | "production" => Ok(Mode::Prod),
            _ => Err(ConfigError::InvalidValue {
                key: "TRIBUTARY_MODE",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub label: String,
    /// Open a `debug` span around every dispatch pass.
    pub span_per_dispatch: bool,
    /// Log commands that matched no flow.
    pub log_unmatched_commands: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::for_mode("coordinator", Mode::Dev)
    }
}

impl CoordinatorConfig {
    pub fn for_mode(label: impl Into<String>, mode: Mode) -> Self {
        let dev = mode == Mode::Dev;
        Self {
            label: label.into(),
            span_per_dispatch: dev,
            log_unmatched_commands: dev,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("TRIBUTARY_MODE") {
            Some(value) => Mode::parse(&value)?,
            None => Mode::default(),
        };
        let label = lookup("TRIBUTARY_LABEL").unwrap_or_else(|| "coordinator".to_string());
        Ok(Self::for_mode(label, mode))
    }
}
