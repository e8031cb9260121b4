use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse runtime config: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid runtime config: {message}")]
    Invalid { message: String },
}

/// Runtime knobs. Every field has a default, so an empty file is valid.
///
/// ```toml
/// start_url = "https://conduit.test/"
/// poll_interval_ms = 5
/// max_messages = 10000
/// trace_patches = false
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Location a fresh surface starts at.
    pub start_url: String,
    /// How long the loop blocks on an empty queue before rechecking idleness.
    pub poll_interval_ms: u64,
    /// Upper bound on messages processed by one `run_until_quiescent`.
    pub max_messages: usize,
    /// Log every applied patch at debug level.
    pub trace_patches: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            start_url: "http://localhost/".to_string(),
            poll_interval_ms: 5,
            max_messages: 10_000,
            trace_patches: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages == 0 {
            return Err(ConfigError::Invalid {
                message: "max_messages must be at least 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "poll_interval_ms must be at least 1".to_string(),
            });
        }
        self.start_url()?;
        Ok(())
    }

    pub fn start_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.start_url).map_err(|e| ConfigError::Invalid {
            message: format!("start_url '{}': {e}", self.start_url),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
