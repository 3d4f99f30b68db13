//! Run configuration.

use agentloom_core::error::Error;
use serde::{Deserialize, Serialize};

/// Configuration for one scheduler's runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum steps per run before the run terminates with
    /// `max_steps_reached` (safety limit).
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Buffer size of the streaming-mode channel.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_max_steps() -> usize {
    25
}

fn default_stream_buffer() -> usize {
    128
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl RunConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        toml::from_str(raw).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = RunConfig::default();
        assert_eq!(config.max_steps, 25);
        assert_eq!(config.stream_buffer, 128);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = RunConfig::from_toml_str("max_steps = 3").unwrap();
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.stream_buffer, 128);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = RunConfig::from_toml_str("max_steps = \"lots\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
