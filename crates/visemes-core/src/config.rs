//! Adapter configuration.
//!
//! Loaded from TOML, e.g.:
//!
//! ```toml
//! enabled = true
//! force = false
//! eager_init = false
//! retry = { after_frames = 60 }
//! laughter = "force_zero"
//! initial_smoothing = 0.3
//!
//! [backend]
//! model_path = "rml_mods/model/model.onnx"
//! sample_rate = 48000
//! frame_size = 1024
//! ```

use crate::backend::BackendConfig;
use crate::context::MAX_SMOOTHING;
use crate::error::{Error, Result};
use crate::viseme::LaughterPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When to rebuild a context after a construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Try again on the next frame.
    #[default]
    EveryFrame,
    /// Try again once this many frames have been skipped.
    AfterFrames(u32),
    /// Stay failed until the instance is disposed.
    Never,
}

impl RetryPolicy {
    /// Whether to attempt construction given the frames skipped since the last failure.
    #[inline]
    pub fn should_retry(self, skipped_frames: u32) -> bool {
        match self {
            RetryPolicy::EveryFrame => true,
            RetryPolicy::AfterFrames(n) => skipped_frames >= n,
            RetryPolicy::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Master switch. Disabled adapters answer every frame with silence.
    pub enabled: bool,
    /// Take over instances even when a native lip-sync path is available.
    pub force: bool,
    /// Build the context in `on_init` instead of on the first frame.
    pub eager_init: bool,
    pub retry: RetryPolicy,
    pub laughter: LaughterPolicy,
    /// Smoothing used until the host reports one.
    pub initial_smoothing: f32,
    pub backend: BackendConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force: false,
            eager_init: false,
            retry: RetryPolicy::default(),
            laughter: LaughterPolicy::default(),
            initial_smoothing: 0.0,
            backend: BackendConfig::default(),
        }
    }
}

impl AdapterConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded adapter config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_smoothing.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "initial_smoothing must be finite, got {}",
                self.initial_smoothing
            )));
        }
        if self.backend.sample_rate == 0 {
            return Err(Error::InvalidConfig("backend.sample_rate must be non-zero".into()));
        }
        if self.initial_smoothing > MAX_SMOOTHING || self.initial_smoothing < 0.0 {
            tracing::warn!(
                "initial_smoothing {} is outside [0, {}] and will be clamped",
                self.initial_smoothing,
                MAX_SMOOTHING
            );
        }
        Ok(())
    }
}
