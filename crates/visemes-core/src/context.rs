//! Analysis context: one live inference session for one host instance.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready ──dispose──▶ Disposed
//!                                    │                                    ▲
//!                                    └──────────────err───────────────────┘
//! ```

use crate::backend::{BackendConfig, BackendFactory};
use crate::completion::Completion;
use crate::error::{Error, Result};
use crate::interface::{CompatInterface, ProcessResult};
use crate::viseme::{LaughterPolicy, VisemeWeights, VISEME_COUNT};

/// Upper bound for the smoothing coefficient. 1.0 would freeze the output.
pub const MAX_SMOOTHING: f32 = 0.98;

/// Clamps a host smoothing value into [0, [`MAX_SMOOTHING`]]. NaN becomes 0.
#[inline]
pub fn clamp_smoothing(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_SMOOTHING)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

/// What [`AnalysisContext::analyze`] did with the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Inferred weights were written.
    Written,
    /// The frame was silent; the silence vector was written.
    Silent,
    /// Inference failed; the buffer is untouched.
    Failed,
    /// Called before `Ready` or after `Disposed`; the buffer is untouched.
    NotReady,
}

#[derive(Debug)]
pub struct AnalysisContext {
    state: ContextState,
    smoothing: f32,
    laughter: LaughterPolicy,
    interface: Option<CompatInterface>,
    previous: Option<VisemeWeights>,
    /// Failure tags already reported at warn level.
    reported: Vec<&'static str>,
}

impl AnalysisContext {
    /// An uninitialized context. Call [`initialize`](Self::initialize) before analyzing.
    pub fn new(smoothing: f32, laughter: LaughterPolicy) -> Self {
        Self {
            state: ContextState::Uninitialized,
            smoothing: clamp_smoothing(smoothing),
            laughter,
            interface: None,
            previous: None,
            reported: Vec::new(),
        }
    }

    /// Builds a backend through `factory`, wraps it, and returns a `Ready` context.
    pub fn create(
        factory: &BackendFactory,
        config: &BackendConfig,
        smoothing: f32,
        laughter: LaughterPolicy,
    ) -> Result<Self> {
        let mut context = Self::new(smoothing, laughter);
        context.initialize(factory, config)?;
        Ok(context)
    }

    /// Runs construction. On error the context ends up `Disposed` and everything acquired on
    /// the way has been released.
    pub fn initialize(&mut self, factory: &BackendFactory, config: &BackendConfig) -> Result<()> {
        if self.state != ContextState::Uninitialized {
            return Err(Error::InterfaceInit(format!(
                "context cannot be initialized from state {:?}",
                self.state
            )));
        }
        self.state = ContextState::Initializing;

        let backend = match factory(config) {
            Ok(backend) => backend,
            Err(e) => {
                self.state = ContextState::Disposed;
                return Err(e);
            }
        };

        let interface =
            match CompatInterface::construct(backend, config.sample_rate, config.frame_size) {
                Ok(interface) => interface,
                Err(e) => {
                    self.state = ContextState::Disposed;
                    return Err(e);
                }
            };

        tracing::info!(
            "Viseme context initialized (sr={} Hz, bufferSize={})",
            interface.sample_rate(),
            interface.frame_size()
        );

        self.interface = Some(interface);
        self.state = ContextState::Ready;
        Ok(())
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ContextState::Ready
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn laughter_policy(&self) -> LaughterPolicy {
        self.laughter
    }

    pub fn last_error(&self) -> Option<&str> {
        self.interface.as_ref().and_then(|i| i.last_error())
    }

    /// Stores a new smoothing coefficient, clamped to [0, 0.98]. No-op once disposed.
    pub fn update(&mut self, smoothing: f32) {
        if self.state == ContextState::Disposed {
            return;
        }
        self.smoothing = clamp_smoothing(smoothing);
    }

    /// Analyzes one frame into `out` and signals `done` exactly once.
    ///
    /// `out` is written only on [`AnalyzeOutcome::Written`] and [`AnalyzeOutcome::Silent`].
    pub fn analyze<F: FnOnce()>(
        &mut self,
        frame: &[f32],
        out: &mut [f32],
        done: &mut Completion<F>,
    ) -> AnalyzeOutcome {
        let outcome = self.analyze_inner(frame, out);
        done.signal();
        outcome
    }

    fn analyze_inner(&mut self, frame: &[f32], out: &mut [f32]) -> AnalyzeOutcome {
        if self.state != ContextState::Ready || out.len() < VISEME_COUNT {
            return AnalyzeOutcome::NotReady;
        }
        let interface = match self.interface.as_mut() {
            Some(interface) => interface,
            None => return AnalyzeOutcome::NotReady,
        };

        let mut weights = VisemeWeights::zero();
        match interface.process(frame, &mut weights) {
            ProcessResult::Silent => {
                self.previous = Some(weights);
                weights.write_into(out);
                AnalyzeOutcome::Silent
            }
            ProcessResult::Inferred => {
                let mut smoothed = match self.previous {
                    Some(prev) if self.smoothing > 0.0 => weights.smoothed_from(&prev, self.smoothing),
                    _ => weights,
                };
                self.previous = Some(smoothed);
                self.laughter.apply(&mut smoothed, out);
                smoothed.write_into(out);
                AnalyzeOutcome::Written
            }
            ProcessResult::Failed => {
                let tag = interface.last_error_tag().unwrap_or("inference");
                let message = interface.last_error().unwrap_or("unknown error");
                if first_report(&mut self.reported, tag) {
                    tracing::warn!("[{}] Viseme inference failed: {}", tag, message);
                } else {
                    tracing::debug!("[{}] Viseme inference failed: {}", tag, message);
                }
                AnalyzeOutcome::Failed
            }
        }
    }

    /// Releases the interface, then the backend. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == ContextState::Disposed && self.interface.is_none() {
            return;
        }
        self.state = ContextState::Disposed;
        self.previous = None;

        if let Some(mut interface) = self.interface.take() {
            let backend = interface.release();
            drop(interface);
            if let Some(mut backend) = backend {
                backend.release();
            }
            tracing::debug!("Viseme context disposed");
        }
    }
}

/// Records `tag` and returns true the first time it is seen.
fn first_report(reported: &mut Vec<&'static str>, tag: &'static str) -> bool {
    if reported.contains(&tag) {
        false
    } else {
        reported.push(tag);
        true
    }
}

impl Drop for AnalysisContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
