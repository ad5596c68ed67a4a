#![forbid(unsafe_code)]

//! Validation pipeline configuration.

use std::num::ParseIntError;

use thiserror::Error;
use web_time::Duration;

/// Default quiet period before a snapshot is validated.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Environment variable overriding the debounce window, in milliseconds.
pub const DEBOUNCE_ENV: &str = "ADDRFORM_DEBOUNCE_MS";

/// Errors produced while reading configuration overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidDuration {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Configuration for [`ValidationPipeline`](crate::pipeline::ValidationPipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Quiet period a snapshot must survive before it is validated.
    /// Zero still defers to the next timer pass.
    /// Default: 150ms.
    pub debounce: Duration,

    /// Skip evaluation when the debounced snapshot equals the last evaluated
    /// one.
    /// Default: true.
    pub dedup: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            dedup: true,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Defaults overridden by [`DEBOUNCE_ENV`] when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(DEBOUNCE_ENV) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidDuration {
                    var: DEBOUNCE_ENV,
                    value: raw.clone(),
                    source,
                })?;
            config.debounce = Duration::from_millis(ms);
        }
        Ok(config)
    }
}
