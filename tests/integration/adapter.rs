//! Adapter entry point tests
//!
//! Drives `on_init`, `on_smoothing_change`, `on_frame` and `on_dispose` against mock backends.

use crate::helpers::*;
use approx::assert_relative_eq;
use std::sync::Arc;
use visemes::prelude::*;

struct HostNative {
    active: bool,
    disposed: usize,
}

impl NativeLipSync for HostNative {
    fn is_active(&self) -> bool {
        self.active
    }

    fn dispose(&mut self) {
        self.disposed += 1;
    }
}

#[test]
fn test_disabled_adapter_writes_silence_once() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    adapter.set_enabled(false);

    let probe = CompletionProbe::new();
    let mut out = [0.3f32; VISEME_COUNT];
    let outcome = adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, probe.callback());

    assert_eq!(outcome, FrameOutcome::Disabled);
    assert_silence(&out);
    assert_eq!(probe.count(), 1);
    assert_eq!(counters.builds(), 0);
}

#[test]
fn test_remote_audio_writes_silence_once() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    adapter.on_init(1, 0.0, None);

    let probe = CompletionProbe::new();
    let mut out = [0.3f32; VISEME_COUNT];
    let outcome = adapter.on_frame(1, &speech_frame(), FrameSource::Remote, &mut out, probe.callback());

    assert_eq!(outcome, FrameOutcome::RemoteSource);
    assert_silence(&out);
    assert_eq!(probe.count(), 1);
    assert_eq!(counters.infers(), 0);
}

#[test]
fn test_reenabling_resumes_inference() {
    let (factory, _counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    adapter.set_enabled(false);
    adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    adapter.set_enabled(true);
    let outcome = adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);

    assert_eq!(outcome, FrameOutcome::Inferred);
    assert_eq!(&out, fixed_weights().as_array());
}

#[test]
fn test_contexts_are_reused_across_rounds() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    for _ in 0..2 {
        adapter.on_init(5, 0.2, None);
        adapter.on_frame(5, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
        adapter.on_frame(5, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    }

    assert_eq!(counters.builds(), 1);
    assert_eq!(counters.infers(), 4);
    assert_eq!(adapter.stats().active_contexts, 1);
}

#[test]
fn test_dispose_removes_entry_and_releases_once() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    adapter.on_init(2, 0.0, None);
    adapter.on_frame(2, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    assert!(adapter.has_context(2));

    assert!(adapter.on_dispose(2));
    assert!(!adapter.has_context(2));
    assert!(!adapter.on_dispose(2));
    assert_eq!(counters.releases(), 1);
    assert_eq!(counters.drops(), 1);
    assert_eq!(adapter.smoothing(2), None);
}

#[test]
fn test_missing_model_yields_silence_without_context() {
    let (factory, _counters) = failing_factory();
    let adapter = test_adapter(factory);
    adapter.on_init(3, 0.0, None);

    let probe = CompletionProbe::new();
    let mut out = [0.7f32; VISEME_COUNT];
    let outcome = adapter.on_frame(3, &speech_frame(), FrameSource::Local, &mut out, probe.callback());

    assert_eq!(outcome, FrameOutcome::ConstructionFailed);
    assert_silence(&out);
    assert_eq!(probe.count(), 1);
    assert!(!adapter.has_context(3));

    for _ in 0..3 {
        adapter.on_frame(3, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
        assert_silence(&out);
    }
    let stats = adapter.stats();
    assert_eq!(stats.construction_failures, 4);
    assert_eq!(stats.contexts_created, 0);
}

#[test]
fn test_construction_recovers_after_failures() {
    let (factory, counters) = flaky_factory(2);
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    let outcomes: Vec<_> = (0..3)
        .map(|_| adapter.on_frame(4, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            FrameOutcome::ConstructionFailed,
            FrameOutcome::ConstructionFailed,
            FrameOutcome::Inferred,
        ]
    );
    assert_eq!(counters.builds(), 1);
    assert_eq!(&out, fixed_weights().as_array());
}

#[test]
fn test_native_instance_is_left_alone() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut native = HostNative {
        active: true,
        disposed: 0,
    };

    assert_eq!(adapter.on_init(6, 0.0, Some(&mut native)), InitDecision::DeferredToNative);

    let probe = CompletionProbe::new();
    let mut out = [0.42f32; VISEME_COUNT];
    let outcome = adapter.on_frame(6, &speech_frame(), FrameSource::Local, &mut out, probe.callback());

    assert_eq!(outcome, FrameOutcome::DeferredToNative);
    assert_eq!(out, [0.42; VISEME_COUNT]);
    assert_eq!(probe.count(), 1);
    assert_eq!(native.disposed, 0);
    assert_eq!(counters.builds(), 0);
}

#[test]
fn test_inactive_native_is_disposed_and_claimed() {
    let (factory, _counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut native = HostNative {
        active: false,
        disposed: 0,
    };

    assert_eq!(adapter.on_init(7, 0.0, Some(&mut native)), InitDecision::Claimed);
    assert_eq!(native.disposed, 1);
}

#[test]
fn test_force_toggle_applies_to_next_init() {
    let (factory, _counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut native = HostNative {
        active: true,
        disposed: 0,
    };

    assert_eq!(adapter.on_init(8, 0.0, Some(&mut native)), InitDecision::DeferredToNative);
    adapter.set_force(true);

    let mut out = [0.0f32; VISEME_COUNT];
    let outcome = adapter.on_frame(8, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    assert_eq!(outcome, FrameOutcome::DeferredToNative);

    assert_eq!(adapter.on_init(8, 0.0, Some(&mut native)), InitDecision::Claimed);
    assert_eq!(native.disposed, 1);
    let outcome = adapter.on_frame(8, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    assert_eq!(outcome, FrameOutcome::Inferred);
}

#[test]
fn test_unknown_instance_is_claimed_lazily() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    let outcome = adapter.on_frame(99, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    assert_eq!(outcome, FrameOutcome::Inferred);
    assert_eq!(counters.builds(), 1);
}

#[test]
fn test_smoothing_before_first_frame_is_used() {
    let (factory, _counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    adapter.on_init(10, 0.0, None);
    adapter.on_smoothing_change(10, 1.5);
    assert_eq!(adapter.smoothing(10), Some(0.98));

    // First inferred frame after a silent one blends from silence with s = 0.98.
    let mut out = [0.0f32; VISEME_COUNT];
    adapter.on_frame(10, &generate_silence(TEST_FRAME_SIZE), FrameSource::Local, &mut out, None::<fn()>);
    adapter.on_frame(10, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);

    let expected_aa = 0.02 * fixed_weights().get(Viseme::AA);
    assert_relative_eq!(out[Viseme::AA.index()], expected_aa, epsilon = tolerances::SMOOTHING_EPSILON);
    assert_relative_eq!(out[0], 0.98, epsilon = tolerances::SMOOTHING_EPSILON);
}

#[test]
fn test_shutdown_and_drop_dispose_everything() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];
    for id in 0..3 {
        adapter.on_frame(id, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    }

    assert_eq!(adapter.shutdown(), 3);
    assert_eq!(counters.releases(), 3);

    adapter.on_frame(0, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    drop(adapter);
    assert_eq!(counters.releases(), 4);
    assert_eq!(counters.drops(), 4);
}

#[test]
fn test_instances_on_separate_threads() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = Arc::new(test_adapter(factory));

    let handles: Vec<_> = (0..4u64)
        .map(|id| {
            let adapter = adapter.clone();
            std::thread::spawn(move || {
                let mut out = [0.0f32; VISEME_COUNT];
                for _ in 0..50 {
                    let outcome =
                        adapter.on_frame(id, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
                    assert_eq!(outcome, FrameOutcome::Inferred);
                }
                adapter.on_dispose(id)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(counters.builds(), 4);
    assert_eq!(counters.releases(), 4);
    assert_eq!(adapter.stats().frames_inferred, 200);
}

#[test]
fn test_slow_model_load_does_not_stall_other_instances() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    let started = Arc::new(AtomicBool::new(false));
    let (factory, counters) = slow_factory(Duration::from_millis(800), started.clone());
    let adapter = Arc::new(test_adapter(factory));

    let loading = {
        let adapter = adapter.clone();
        std::thread::spawn(move || {
            let mut out = [0.0f32; VISEME_COUNT];
            adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>)
        })
    };
    while !started.load(Ordering::SeqCst) {
        std::thread::yield_now();
    }

    let mut worst = Duration::ZERO;
    let mut out = [0.0f32; VISEME_COUNT];
    for id in 2..200 {
        let begin = Instant::now();
        let outcome = adapter.on_frame(id, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
        let _ = adapter.stats();
        worst = worst.max(begin.elapsed());
        assert_eq!(outcome, FrameOutcome::Inferred);
    }
    assert!(worst < Duration::from_millis(200), "worst frame for another instance: {worst:?}");
    assert!(!adapter.has_context(1));

    assert_eq!(loading.join().unwrap(), FrameOutcome::Inferred);
    assert!(adapter.has_context(1));
    assert_eq!(counters.builds(), 199);
}

#[test]
fn test_silent_gap_reaches_backend() {
    let (factory, counters) = mock_factory(fixed_weights());
    let adapter = test_adapter(factory);
    let mut out = [0.0f32; VISEME_COUNT];

    adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);
    for _ in 0..100 {
        let outcome = adapter.on_frame(
            1,
            &generate_silence(TEST_FRAME_SIZE),
            FrameSource::Local,
            &mut out,
            None::<fn()>,
        );
        assert_eq!(outcome, FrameOutcome::Silent);
        assert_silence(&out);
    }
    adapter.on_frame(1, &speech_frame(), FrameSource::Local, &mut out, None::<fn()>);

    assert_eq!(counters.infers(), 2);
    assert_eq!(counters.samples(), 102 * TEST_FRAME_SIZE);
}
