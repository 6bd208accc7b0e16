//! Test helpers and fixtures for visemes integration tests
//!
//! Mock backends count every lifecycle event so tests can check that contexts are built,
//! reused and released exactly as often as expected.

#![allow(dead_code)]

pub mod tolerances;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use visemes::core::Error;
use visemes::prelude::*;
use visemes::{backend_factory, BackendCapabilities, BackendFactory};

/// Host sample rate used throughout the tests
pub const TEST_SAMPLE_RATE: u32 = 48_000;

/// Host frame size used throughout the tests
pub const TEST_FRAME_SIZE: usize = 256;

/// Generate a sine wave at `frequency` Hz.
pub fn generate_sine(frequency: f32, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect()
}

pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// One frame of speech-like audio at the test rate.
pub fn speech_frame() -> Vec<f32> {
    generate_sine(220.0, TEST_SAMPLE_RATE, TEST_FRAME_SIZE)
}

/// The vector every [`MockBackend`] returns unless told otherwise.
pub fn fixed_weights() -> VisemeWeights {
    let mut weights = VisemeWeights::zero();
    weights.set(Viseme::AA, 0.6);
    weights.set(Viseme::OH, 0.25);
    weights.set(Viseme::PP, 0.15);
    weights
}

/// Lifecycle counters shared between a factory and the backends it builds.
#[derive(Debug, Default)]
pub struct MockCounters {
    pub builds: AtomicUsize,
    pub infers: AtomicUsize,
    /// Samples handed to the backend, inferred or observed.
    pub samples: AtomicUsize,
    pub releases: AtomicUsize,
    pub drops: AtomicUsize,
}

impl MockCounters {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn infers(&self) -> usize {
        self.infers.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    weights: VisemeWeights,
    counters: Arc<MockCounters>,
}

impl VisemeBackend for MockBackend {
    fn infer(&mut self, frame: &[f32]) -> visemes::core::Result<VisemeWeights> {
        self.counters.infers.fetch_add(1, Ordering::SeqCst);
        self.counters.samples.fetch_add(frame.len(), Ordering::SeqCst);
        Ok(self.weights)
    }

    fn observe(&mut self, frame: &[f32]) {
        self.counters.samples.fetch_add(frame.len(), Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "Mock".into(),
            model_sample_rate: 16_000,
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.counters.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A factory building [`MockBackend`]s that return `weights`.
pub fn mock_factory(weights: VisemeWeights) -> (BackendFactory, Arc<MockCounters>) {
    let counters = Arc::new(MockCounters::default());
    let shared = counters.clone();
    let factory = backend_factory(move |_config| {
        shared.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBackend {
            weights,
            counters: shared.clone(),
        }) as Box<dyn VisemeBackend>)
    });
    (factory, counters)
}

/// A factory that fails like a missing model for the first `failures` attempts.
pub fn flaky_factory(failures: usize) -> (BackendFactory, Arc<MockCounters>) {
    let counters = Arc::new(MockCounters::default());
    let attempts = Arc::new(AtomicUsize::new(0));
    let shared = counters.clone();
    let factory = backend_factory(move |config| {
        if attempts.fetch_add(1, Ordering::SeqCst) < failures {
            return Err(Error::ModelLoad {
                path: config.model_path.clone(),
                reason: "file not found".into(),
            });
        }
        shared.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBackend {
            weights: fixed_weights(),
            counters: shared.clone(),
        }) as Box<dyn VisemeBackend>)
    });
    (factory, counters)
}

/// A factory whose first build sleeps for `delay` after setting `started`.
pub fn slow_factory(delay: Duration, started: Arc<AtomicBool>) -> (BackendFactory, Arc<MockCounters>) {
    let counters = Arc::new(MockCounters::default());
    let shared = counters.clone();
    let factory = backend_factory(move |_config| {
        if shared.builds.fetch_add(1, Ordering::SeqCst) == 0 {
            started.store(true, Ordering::SeqCst);
            std::thread::sleep(delay);
        }
        Ok(Box::new(MockBackend {
            weights: fixed_weights(),
            counters: shared.clone(),
        }) as Box<dyn VisemeBackend>)
    });
    (factory, counters)
}

/// A factory that always fails like a missing model.
pub fn failing_factory() -> (BackendFactory, Arc<MockCounters>) {
    flaky_factory(usize::MAX)
}

/// Adapter over `factory` at the test sample rate.
pub fn test_adapter(factory: BackendFactory) -> VisemeAdapter {
    VisemeAdapter::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .frame_size(TEST_FRAME_SIZE)
        .backend(factory)
        .build()
        .expect("Failed to create test adapter")
}

/// Counts completion callbacks.
#[derive(Clone, Default)]
pub struct CompletionProbe {
    count: Arc<AtomicUsize>,
}

impl CompletionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> Option<impl FnOnce()> {
        let count = self.count.clone();
        Some(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

pub fn assert_silence(out: &[f32]) {
    assert_eq!(out[0], 1.0, "sil weight should be 1: {:?}", out);
    assert!(out[1..].iter().all(|w| *w == 0.0), "non-zero weights in {:?}", out);
}

pub fn assert_unit_range(out: &[f32]) {
    assert!(
        out.iter().all(|w| (0.0..=1.0).contains(w)),
        "weights out of [0, 1]: {:?}",
        out
    );
}
