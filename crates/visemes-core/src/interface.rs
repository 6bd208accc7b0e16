//! Compatibility interface between the host's fixed call shape and a backend.
//!
//! The host always calls with a sample rate and frame size fixed at construction time and a
//! fixed-size output buffer. The interface validates that shape, short-circuits silent frames,
//! sanitizes backend output, and turns every per-call failure into a recorded, tagged error
//! instead of an error or panic.

use crate::audio::is_silent;
use crate::backend::{BackendCapabilities, VisemeBackend};
use crate::error::{Error, Result};
use crate::viseme::VisemeWeights;

/// Outcome of one [`CompatInterface::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Frame was silent; output is the silence vector. The backend only observed the frame.
    Silent,
    /// Backend produced weights.
    Inferred,
    /// Nothing was written; see [`CompatInterface::last_error`].
    Failed,
}

#[derive(Debug)]
pub struct CompatInterface {
    backend: Option<Box<dyn VisemeBackend>>,
    sample_rate: u32,
    frame_size: usize,
    initialized: bool,
    last_error: Option<(&'static str, String)>,
}

impl CompatInterface {
    /// Wraps a backend built for `sample_rate`.
    ///
    /// `frame_size` is kept for call-shape stability only. On failure the backend is dropped
    /// after [`VisemeBackend::release`], so nothing acquired so far outlives the error.
    pub fn construct(
        mut backend: Box<dyn VisemeBackend>,
        sample_rate: u32,
        frame_size: usize,
    ) -> Result<Self> {
        if sample_rate == 0 {
            backend.release();
            return Err(Error::InterfaceInit("sample rate must be non-zero".into()));
        }

        let caps = backend.capabilities();
        if caps.model_sample_rate == 0 {
            backend.release();
            return Err(Error::InterfaceInit(format!(
                "backend '{}' reports a zero model sample rate",
                caps.name
            )));
        }

        tracing::debug!(
            "Compatibility interface ready (backend={}, sr={} Hz, model sr={} Hz, frame={})",
            caps.name,
            sample_rate,
            caps.model_sample_rate,
            frame_size
        );

        Ok(Self {
            backend: Some(backend),
            sample_rate,
            frame_size,
            initialized: true,
            last_error: None,
        })
    }

    /// True once construction succeeded, until [`release`](Self::release).
    ///
    /// Per-call inference failures do not affect it.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last per-call failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|(_, message)| message.as_str())
    }

    /// Log tag of the last per-call failure, as in [`Error::tag`].
    pub fn last_error_tag(&self) -> Option<&'static str> {
        self.last_error.as_ref().map(|(tag, _)| *tag)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn capabilities(&self) -> Option<BackendCapabilities> {
        self.backend.as_ref().map(|b| b.capabilities())
    }

    /// Runs one frame. Writes `out` only on `Silent` or `Inferred`.
    pub fn process(&mut self, frame: &[f32], out: &mut VisemeWeights) -> ProcessResult {
        let backend = match (self.initialized, self.backend.as_mut()) {
            (true, Some(backend)) => backend,
            _ => {
                self.last_error = Some(("interface-init", "interface is not initialized".into()));
                return ProcessResult::Failed;
            }
        };

        if frame.is_empty() {
            self.last_error = Some(("inference", "empty audio frame".into()));
            return ProcessResult::Failed;
        }

        if is_silent(frame) {
            backend.observe(frame);
            *out = VisemeWeights::silence();
            return ProcessResult::Silent;
        }

        match backend.infer(frame) {
            Ok(mut weights) => {
                weights.sanitize();
                *out = weights;
                ProcessResult::Inferred
            }
            Err(e) => {
                self.last_error = Some((e.tag(), e.to_string()));
                ProcessResult::Failed
            }
        }
    }

    /// Marks the interface uninitialized and hands the backend back to the caller.
    ///
    /// Returns `None` on every call after the first.
    pub fn release(&mut self) -> Option<Box<dyn VisemeBackend>> {
        self.initialized = false;
        self.backend.take()
    }
}

impl Drop for CompatInterface {
    fn drop(&mut self) {
        if let Some(mut backend) = self.release() {
            backend.release();
        }
    }
}
