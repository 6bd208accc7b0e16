//! Inference backend abstraction.
//!
//! Defines the [`VisemeBackend`] trait that inference runtimes (ONNX Runtime, mocks in tests,
//! etc.) implement. Backends take flat `&[f32]` audio at the host sample rate and return a full
//! [`VisemeWeights`] vector; resampling and feature extraction stay inside the backend.

use crate::error::Result;
use crate::viseme::VisemeWeights;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Model location used when no path is configured, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "rml_mods/model/model.onnx";

/// Host sample rate assumed when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Host simulation frame size assumed when none is configured.
pub const DEFAULT_FRAME_SIZE: usize = 1024;

/// Parameters a backend is built from. Immutable once the backend exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Model file. Blank means [`DEFAULT_MODEL_PATH`].
    pub model_path: PathBuf,
    /// Host sample rate in Hz.
    pub sample_rate: u32,
    /// Frame size hint in samples. Advisory; backends may ignore it.
    pub frame_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

impl BackendConfig {
    pub fn new(model_path: impl Into<PathBuf>, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            model_path: model_path.into(),
            sample_rate,
            frame_size,
        }
    }

    /// The configured model path, falling back to [`DEFAULT_MODEL_PATH`] when blank.
    ///
    /// Logs the relative and absolute forms along with the working directory so a missing
    /// model can be diagnosed from the log alone.
    pub fn resolve_model_path(&self) -> PathBuf {
        let blank = self.model_path.as_os_str().is_empty()
            || self.model_path.to_string_lossy().trim().is_empty();
        let path = if blank {
            PathBuf::from(DEFAULT_MODEL_PATH)
        } else {
            self.model_path.clone()
        };

        let cwd = std::env::current_dir().unwrap_or_default();
        let absolute = absolute_path(&cwd, &path);
        tracing::info!(
            "Looking for viseme model at '{}' (cwd='{}', abs='{}')",
            path.display(),
            cwd.display(),
            absolute.display()
        );

        path
    }
}

fn absolute_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Static description of a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCapabilities {
    /// e.g. "ONNX Runtime", "Mock"
    pub name: String,
    /// Rate the model consumes internally; the backend resamples host audio to it.
    pub model_sample_rate: u32,
}

/// Synchronous viseme inference over host audio frames.
///
/// # Lifecycle
///
/// 1. Built by a [`BackendFactory`] from a [`BackendConfig`]
/// 2. [`infer`](Self::infer) or [`observe`](Self::observe) once per audio frame, from one
///    caller at a time
/// 3. [`release`](Self::release) exactly once, then dropped
pub trait VisemeBackend: Send + Sync {
    /// Infers weights for one frame of mono samples at the configured host rate.
    ///
    /// Returns a fresh vector; on failure nothing has been written anywhere.
    fn infer(&mut self, frame: &[f32]) -> Result<VisemeWeights>;

    /// Consumes a frame whose weights are not needed, such as silence.
    ///
    /// Streaming backends advance their buffered audio here so the next inference does not
    /// run on audio from before the gap.
    fn observe(&mut self, _frame: &[f32]) {}

    /// Releases native resources ahead of drop.
    fn release(&mut self) {}

    fn capabilities(&self) -> BackendCapabilities;
}

impl fmt::Debug for dyn VisemeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisemeBackend")
            .field("name", &self.capabilities().name)
            .finish()
    }
}

/// Builds backends. Shared so contexts can be rebuilt for retries and for each host instance.
pub type BackendFactory =
    Arc<dyn Fn(&BackendConfig) -> Result<Box<dyn VisemeBackend>> + Send + Sync>;

/// Wraps a closure as a [`BackendFactory`].
pub fn backend_factory<F>(f: F) -> BackendFactory
where
    F: Fn(&BackendConfig) -> Result<Box<dyn VisemeBackend>> + Send + Sync + 'static,
{
    Arc::new(f)
}
