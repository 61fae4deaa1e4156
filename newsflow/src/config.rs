//! Pipeline configuration, loadable from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::curator::CuratorConfig;
use crate::draft::{Platform, StyleConfig};
use crate::fetch::SourceDescriptor;
use crate::publish::RetryPolicy;

/// Error loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but is structurally unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One publishing target and whether it gates run completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// The platform.
    pub platform: Platform,
    /// Required platforms must succeed for the run to complete; optional
    /// platform failures are recorded but do not fail the run.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl PlatformConfig {
    /// A required platform.
    #[must_use]
    pub fn required(platform: Platform) -> Self {
        Self {
            platform,
            required: true,
        }
    }

    /// An optional (best-effort) platform.
    #[must_use]
    pub fn optional(platform: Platform) -> Self {
        Self {
            platform,
            required: false,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feeds to fan out over.
    pub sources: Vec<SourceDescriptor>,
    /// Article time window, in hours.
    pub window_hours: u32,
    /// Per-source fetch timeout, in seconds.
    pub fetch_timeout_secs: u64,
    /// Publishing targets, in publish order.
    pub platforms: Vec<PlatformConfig>,
    /// Keyword and credibility configuration.
    pub curator: CuratorConfig,
    /// Retry discipline for the publish boundary.
    pub retry: RetryPolicy,
    /// Draft style knobs.
    pub style: StyleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            window_hours: 24,
            fetch_timeout_secs: 30,
            platforms: vec![
                PlatformConfig::required(Platform::LinkedIn),
                PlatformConfig::required(Platform::Twitter),
            ],
            curator: CuratorConfig::default(),
            retry: RetryPolicy::default(),
            style: StyleConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that serde cannot express. A run with no
    /// publishing targets has nothing to draft or approve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.platforms.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one publishing platform is required".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-source fetch timeout as a [`Duration`].
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
