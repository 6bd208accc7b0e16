//! Builder for configuring and constructing a `VisemeAdapter`.

use crate::Result;
use std::path::{Path, PathBuf};
use visemes_core::{
    AdapterConfig, BackendFactory, LaughterPolicy, RetryPolicy, VisemeAdapter,
};

#[cfg(feature = "onnx")]
use visemes_onnx::OnnxOptions;

/// Starts from [`AdapterConfig::default`]. Without an explicit [`backend`](Self::backend), the
/// ONNX Runtime backend is used when the `onnx` feature is compiled in.
///
/// # Example
///
/// ```ignore
/// use visemes::prelude::*;
///
/// let adapter = VisemeAdapter::builder()
///     .model_path("rml_mods/model/model.onnx")
///     .sample_rate(48_000)
///     .laughter(LaughterPolicy::ForceZero)
///     .build()?;
/// ```
pub struct VisemeAdapterBuilder {
    config: AdapterConfig,
    backend: Option<BackendFactory>,

    #[cfg(feature = "onnx")]
    onnx: OnnxOptions,
}

impl Default for VisemeAdapterBuilder {
    fn default() -> Self {
        Self {
            config: AdapterConfig::default(),
            backend: None,

            #[cfg(feature = "onnx")]
            onnx: OnnxOptions::default(),
        }
    }
}

impl VisemeAdapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the configuration with the contents of a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = AdapterConfig::load(path.as_ref())?;
        Ok(self)
    }

    /// Default: true
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Default: false
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    /// Default: false
    pub fn eager_init(mut self, eager: bool) -> Self {
        self.config.eager_init = eager;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn laughter(mut self, policy: LaughterPolicy) -> Self {
        self.config.laughter = policy;
        self
    }

    pub fn initial_smoothing(mut self, smoothing: f32) -> Self {
        self.config.initial_smoothing = smoothing;
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.model_path = path.into();
        self
    }

    /// Host sample rate in Hz. Default: 48000
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.backend.sample_rate = sample_rate;
        self
    }

    /// Default: 1024
    pub fn frame_size(mut self, frame_size: usize) -> Self {
        self.config.backend.frame_size = frame_size;
        self
    }

    /// Use a custom inference backend instead of ONNX Runtime.
    pub fn backend(mut self, factory: BackendFactory) -> Self {
        self.backend = Some(factory);
        self
    }

    /// ONNX Runtime options. Ignored when a custom backend is set.
    #[cfg(feature = "onnx")]
    pub fn onnx_options(mut self, options: OnnxOptions) -> Self {
        self.onnx = options;
        self
    }

    pub fn build(self) -> Result<VisemeAdapter> {
        self.config.validate()?;

        let factory = match self.backend {
            Some(factory) => factory,
            #[cfg(feature = "onnx")]
            None => visemes_onnx::onnx_backend_factory(self.onnx),
            #[cfg(not(feature = "onnx"))]
            None => return Err(crate::Error::NoBackend),
        };

        Ok(VisemeAdapter::new(self.config, factory))
    }
}

/// Adds `VisemeAdapter::builder()`.
pub trait VisemeAdapterExt {
    fn builder() -> VisemeAdapterBuilder;
}

impl VisemeAdapterExt for VisemeAdapter {
    fn builder() -> VisemeAdapterBuilder {
        VisemeAdapterBuilder::default()
    }
}
