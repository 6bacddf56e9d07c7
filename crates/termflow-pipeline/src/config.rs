//! TOML configuration shared by the library surfaces and the CLI.
//!
//! ```toml
//! [synchronicity]
//! await_ceiling_ms = 5000
//! default_max_block_ms = 1000
//!
//! [pipeline]
//! propagation = "fused"
//! ```
//!
//! Every key is optional.

use crate::pipeline::Propagation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

const DEFAULT_MAX_BLOCK_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynchronicityConfig {
    /// Upper bound applied to `await_max`; absent means unbounded.
    pub await_ceiling_ms: Option<u64>,
    /// Bound declared by producers the CLI creates.
    pub default_max_block_ms: u64,
}

impl Default for SynchronicityConfig {
    fn default() -> Self {
        Self {
            await_ceiling_ms: None,
            default_max_block_ms: DEFAULT_MAX_BLOCK_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub propagation: Propagation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TermflowConfig {
    pub synchronicity: SynchronicityConfig,
    pub pipeline: PipelineConfig,
}

impl TermflowConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: shown.clone(),
            source,
        })?;
        let config = Self::parse(&text, &shown)?;
        tracing::debug!(path = %shown, ?config, "configuration loaded");
        Ok(config)
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: path.to_string(),
            source,
        })
    }

    pub fn await_ceiling(&self) -> Option<Duration> {
        self.synchronicity.await_ceiling_ms.map(Duration::from_millis)
    }

    pub fn default_max_block(&self) -> Duration {
        Duration::from_millis(self.synchronicity.default_max_block_ms)
    }

    pub fn propagation(&self) -> Propagation {
        self.pipeline.propagation
    }
}
