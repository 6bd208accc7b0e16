//! Viseme inference adapter: the four host entry points.
//!
//! The host drives each instance through `on_init`, `on_smoothing_change`, `on_frame` and
//! `on_dispose`. The adapter decides per instance whether the native lip-sync path keeps it
//! or whether it is claimed, builds analysis contexts lazily, and turns every failure on the
//! frame path into silence plus a completion signal.
//!
//! # Frame path
//!
//! ```text
//! on_frame ─┬─ disabled / remote ─────────────▶ silence
//!           ├─ deferred to native ────────────▶ untouched
//!           ├─ empty frame / short buffer ────▶ silence
//!           ├─ failed, retry not due ─────────▶ silence
//!           └─ table.get_or_create ─┬─ err ───▶ silence, instance marked failed
//!                                   └─ analyze ─▶ weights | silence
//! ```
//!
//! Every branch ends with exactly one completion signal, panics included.

use crate::backend::BackendFactory;
use crate::completion::Completion;
use crate::config::AdapterConfig;
use crate::context::{clamp_smoothing, AnalysisContext, AnalyzeOutcome};
use crate::error::Error;
use crate::lockfree::AtomicFlag;
use crate::stats::{AdapterStats, StatsCounters};
use crate::table::StateTable;
use crate::viseme::{write_silence, VISEME_COUNT};
use crate::InstanceId;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Platform-native lip-sync context for one instance, as seen from the adapter.
pub trait NativeLipSync {
    /// Whether the native path can serve this instance.
    fn is_active(&self) -> bool;

    /// Tears the native context down so the adapter can take over.
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDecision {
    /// The native path keeps the instance; the adapter leaves its frames alone.
    DeferredToNative,
    /// The adapter owns the instance.
    Claimed,
}

/// Where a frame's audio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// Captured on this machine.
    Local,
    /// Received from a remote user. Never analyzed.
    Remote,
}

/// What `on_frame` did. Every variant has already signaled completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Inferred weights were written.
    Inferred,
    /// Silent input; the silence vector was written.
    Silent,
    /// Inference failed for this frame; silence was written.
    InferenceFailed,
    /// Adapter disabled; silence was written.
    Disabled,
    /// Remote audio; silence was written.
    RemoteSource,
    /// The native path owns the instance; the buffer is untouched.
    DeferredToNative,
    /// Empty frame or output buffer shorter than 16; silence was written where it fits.
    InvalidInput,
    /// Construction failed earlier and the retry policy says wait; silence was written.
    RetryPending,
    /// Construction failed on this frame; silence was written.
    ConstructionFailed,
    /// A panic was caught; silence was written.
    Panicked,
}

impl FrameOutcome {
    /// True when the buffer holds the silence vector (or its prefix) after the call.
    pub fn wrote_silence(self) -> bool {
        !matches!(self, FrameOutcome::Inferred | FrameOutcome::DeferredToNative)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstanceMode {
    Native,
    Claimed,
}

#[derive(Debug)]
struct InstanceState {
    mode: InstanceMode,
    smoothing: f32,
    /// Frames skipped since the last construction failure. `None` when not failed.
    failed_skips: Option<u32>,
    /// Error tags already logged at error level for this instance.
    logged: Vec<&'static str>,
}

impl InstanceState {
    fn new(mode: InstanceMode, smoothing: f32) -> Self {
        Self {
            mode,
            smoothing: clamp_smoothing(smoothing),
            failed_skips: None,
            logged: Vec::new(),
        }
    }
}

/// Substitute viseme inference for host instances without a usable native lip-sync path.
///
/// All hooks take `&self`; the adapter can be shared across threads. The host serializes calls
/// for one instance, distinct instances may run concurrently.
pub struct VisemeAdapter {
    config: AdapterConfig,
    factory: BackendFactory,
    enabled: AtomicFlag,
    force: AtomicFlag,
    table: StateTable,
    instances: DashMap<InstanceId, InstanceState>,
    stats: StatsCounters,
}

impl VisemeAdapter {
    pub fn new(config: AdapterConfig, factory: BackendFactory) -> Self {
        tracing::info!(
            "Viseme adapter created (enabled={}, force={}, eager_init={}, retry={:?}, laughter={:?})",
            config.enabled,
            config.force,
            config.eager_init,
            config.retry,
            config.laughter
        );
        Self {
            enabled: AtomicFlag::new(config.enabled),
            force: AtomicFlag::new(config.force),
            config,
            factory,
            table: StateTable::new(),
            instances: DashMap::new(),
            stats: StatsCounters::default(),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled) != enabled {
            tracing::info!("Viseme adapter {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_forced(&self) -> bool {
        self.force.get()
    }

    /// Claim instances in `on_init` even when the native path is active. Instances already
    /// deferred stay with the native path until they are initialized again.
    pub fn set_force(&self, force: bool) {
        if self.force.swap(force) != force {
            tracing::info!("Viseme adapter force override {}", if force { "on" } else { "off" });
        }
    }

    /// Whether `id` currently has a live analysis context.
    pub fn has_context(&self, id: InstanceId) -> bool {
        self.table.contains(id)
    }

    /// Smoothing the adapter holds for `id`, if it knows the instance.
    pub fn smoothing(&self, id: InstanceId) -> Option<f32> {
        self.instances.get(&id).map(|state| state.smoothing)
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats.snapshot(self.table.len())
    }

    /// Host instance initialization.
    pub fn on_init(
        &self,
        id: InstanceId,
        smoothing: f32,
        native: Option<&mut dyn NativeLipSync>,
    ) -> InitDecision {
        let native_active = native.as_ref().is_some_and(|n| n.is_active());

        if native_active && !self.force.get() {
            if let Some(mut stale) = self.table.remove(id) {
                stale.dispose();
            }
            self.instances
                .insert(id, InstanceState::new(InstanceMode::Native, smoothing));
            tracing::debug!("Instance {} deferred to native lip-sync", id);
            return InitDecision::DeferredToNative;
        }

        if let Some(native) = native {
            if catch_unwind(AssertUnwindSafe(|| native.dispose())).is_err() {
                tracing::warn!("Native lip-sync dispose panicked for instance {}", id);
            }
        }

        self.instances
            .insert(id, InstanceState::new(InstanceMode::Claimed, smoothing));
        if let Some(mut context) = self.table.get_mut(id) {
            context.update(smoothing);
        }
        tracing::debug!(
            "Instance {} claimed (smoothing={})",
            id,
            clamp_smoothing(smoothing)
        );

        if self.config.eager_init {
            self.ensure_context(id);
        }
        InitDecision::Claimed
    }

    /// Host smoothing change. Stored for later construction and forwarded to a live context.
    pub fn on_smoothing_change(&self, id: InstanceId, smoothing: f32) {
        let clamped = clamp_smoothing(smoothing);
        self.instances
            .entry(id)
            .and_modify(|state| state.smoothing = clamped)
            .or_insert_with(|| InstanceState::new(InstanceMode::Claimed, clamped));

        if let Some(mut context) = self.table.get_mut(id) {
            context.update(clamped);
        }
    }

    /// Analyzes one frame for `id` into `out` and calls `on_done` exactly once.
    ///
    /// Never panics and never returns an error; see [`FrameOutcome`] for what was written.
    pub fn on_frame<F: FnOnce()>(
        &self,
        id: InstanceId,
        frame: &[f32],
        source: FrameSource,
        out: &mut [f32],
        on_done: Option<F>,
    ) -> FrameOutcome {
        let mut done = Completion::new(on_done);
        self.stats.frames.increment();

        let outcome = match catch_unwind(AssertUnwindSafe(|| self.process_frame(id, frame, source, out))) {
            Ok(outcome) => outcome,
            Err(_) => {
                self.stats.panics_caught.increment();
                if self.first_log(id, "panic") {
                    tracing::error!("[panic] Viseme analysis panicked for instance {}", id);
                } else {
                    tracing::debug!("[panic] Viseme analysis panicked again for instance {}", id);
                }
                write_silence(out);
                FrameOutcome::Panicked
            }
        };

        match outcome {
            FrameOutcome::Inferred => self.stats.frames_inferred.increment(),
            FrameOutcome::DeferredToNative => self.stats.frames_deferred.increment(),
            _ => self.stats.frames_silent.increment(),
        }

        done.signal();
        outcome
    }

    fn process_frame(
        &self,
        id: InstanceId,
        frame: &[f32],
        source: FrameSource,
        out: &mut [f32],
    ) -> FrameOutcome {
        if !self.enabled.get() {
            write_silence(out);
            return FrameOutcome::Disabled;
        }
        if source == FrameSource::Remote {
            write_silence(out);
            return FrameOutcome::RemoteSource;
        }

        {
            let mut state = self
                .instances
                .entry(id)
                .or_insert_with(|| InstanceState::new(InstanceMode::Claimed, self.config.initial_smoothing));

            if state.mode == InstanceMode::Native {
                return FrameOutcome::DeferredToNative;
            }

            if frame.is_empty() || out.len() < VISEME_COUNT {
                write_silence(out);
                return FrameOutcome::InvalidInput;
            }

            if let Some(skipped) = state.failed_skips.as_mut() {
                if !self.config.retry.should_retry(*skipped) {
                    *skipped = skipped.saturating_add(1);
                    write_silence(out);
                    return FrameOutcome::RetryPending;
                }
            }
        }

        let mut context = match self.context_for(id) {
            Ok(context) => context,
            Err(_) => {
                write_silence(out);
                return FrameOutcome::ConstructionFailed;
            }
        };

        // The host completion is signaled by `on_frame` once the buffer is final.
        let outcome = context.analyze(frame, out, &mut Completion::none());
        drop(context);

        match outcome {
            AnalyzeOutcome::Written => FrameOutcome::Inferred,
            AnalyzeOutcome::Silent => FrameOutcome::Silent,
            AnalyzeOutcome::Failed => {
                self.stats.inference_failures.increment();
                write_silence(out);
                FrameOutcome::InferenceFailed
            }
            AnalyzeOutcome::NotReady => {
                write_silence(out);
                FrameOutcome::InferenceFailed
            }
        }
    }

    /// Builds the context for `id` now if it does not exist. Used by eager initialization.
    fn ensure_context(&self, id: InstanceId) -> bool {
        self.context_for(id).is_ok()
    }

    fn context_for(
        &self,
        id: InstanceId,
    ) -> crate::Result<dashmap::mapref::one::RefMut<'_, InstanceId, AnalysisContext>> {
        let smoothing = self
            .instances
            .get(&id)
            .map(|state| state.smoothing)
            .unwrap_or_else(|| clamp_smoothing(self.config.initial_smoothing));

        let mut created = false;
        let result = self.table.get_or_create(id, || {
            created = true;
            AnalysisContext::create(
                &self.factory,
                &self.config.backend,
                smoothing,
                self.config.laughter,
            )
        });

        match result {
            Ok(context) => {
                if created {
                    self.stats.contexts_created.increment();
                    self.clear_failure(id);
                    tracing::info!("Viseme context ready for instance {}", id);
                }
                Ok(context)
            }
            Err(e) => {
                self.record_failure(id, &e);
                Err(e)
            }
        }
    }

    fn clear_failure(&self, id: InstanceId) {
        if let Some(mut state) = self.instances.get_mut(&id) {
            state.failed_skips = None;
            state.logged.clear();
        }
    }

    fn record_failure(&self, id: InstanceId, err: &Error) {
        self.stats.construction_failures.increment();
        let tag = err.tag();
        let first = self.first_log(id, tag);
        if let Some(mut state) = self.instances.get_mut(&id) {
            state.failed_skips = Some(0);
        }

        if first {
            tracing::error!("[{}] Failed to create viseme context for instance {}: {}", tag, id, err);
        } else {
            tracing::debug!("[{}] Viseme context still unavailable for instance {}: {}", tag, id, err);
        }
    }

    /// Marks `tag` as logged for `id`. True the first time, so callers log at a visible level
    /// once and at debug afterwards.
    fn first_log(&self, id: InstanceId, tag: &'static str) -> bool {
        let mut state = self
            .instances
            .entry(id)
            .or_insert_with(|| InstanceState::new(InstanceMode::Claimed, self.config.initial_smoothing));
        if state.logged.contains(&tag) {
            false
        } else {
            state.logged.push(tag);
            true
        }
    }

    /// Host instance disposal. Returns true if a context was disposed.
    pub fn on_dispose(&self, id: InstanceId) -> bool {
        let disposed = match self.table.remove(id) {
            Some(mut context) => {
                context.dispose();
                true
            }
            None => false,
        };
        self.instances.remove(&id);
        if disposed {
            tracing::debug!("Viseme context disposed for instance {}", id);
        }
        disposed
    }

    /// Disposes every context and forgets every instance. Returns how many contexts were disposed.
    pub fn shutdown(&self) -> usize {
        let disposed = self.table.dispose_all();
        self.instances.clear();
        if disposed > 0 {
            tracing::info!("Viseme adapter shut down ({} contexts disposed)", disposed);
        }
        disposed
    }
}

impl Drop for VisemeAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for VisemeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisemeAdapter")
            .field("enabled", &self.enabled.get())
            .field("force", &self.force.get())
            .field("contexts", &self.table.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
