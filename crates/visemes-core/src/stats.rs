//! Adapter statistics.

use crate::lockfree::AtomicCounter;

/// Point-in-time copy of the adapter counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Every `on_frame` call.
    pub frames: u64,
    /// Frames answered with backend output.
    pub frames_inferred: u64,
    /// Frames answered with silence, for any reason.
    pub frames_silent: u64,
    /// Frames left to the native path.
    pub frames_deferred: u64,
    /// Per-frame inference failures.
    pub inference_failures: u64,
    /// Contexts that reached `Ready`.
    pub contexts_created: u64,
    pub construction_failures: u64,
    pub panics_caught: u64,
    /// Contexts currently in the table.
    pub active_contexts: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames: AtomicCounter,
    pub frames_inferred: AtomicCounter,
    pub frames_silent: AtomicCounter,
    pub frames_deferred: AtomicCounter,
    pub inference_failures: AtomicCounter,
    pub contexts_created: AtomicCounter,
    pub construction_failures: AtomicCounter,
    pub panics_caught: AtomicCounter,
}

impl StatsCounters {
    pub fn snapshot(&self, active_contexts: usize) -> AdapterStats {
        AdapterStats {
            frames: self.frames.get(),
            frames_inferred: self.frames_inferred.get(),
            frames_silent: self.frames_silent.get(),
            frames_deferred: self.frames_deferred.get(),
            inference_failures: self.inference_failures.get(),
            contexts_created: self.contexts_created.get(),
            construction_failures: self.construction_failures.get(),
            panics_caught: self.panics_caught.get(),
            active_contexts,
        }
    }
}
