//! # Visemes - audio-driven viseme inference
//!
//! Generates per-frame facial viseme weights from live audio for host instances whose native
//! lip-sync engine is absent, disabled, or overridden.
//!
//! ## Architecture
//!
//! Visemes is an umbrella crate that coordinates:
//! - **visemes-core** - Adapter entry points, analysis contexts, state table, configuration
//! - **visemes-onnx** - ONNX Runtime backend (native runtime discovery, model loading,
//!   resampling, inference)
//!
//! ## Quick Start
//!
//! ```ignore
//! use visemes::prelude::*;
//!
//! visemes::logging::init();
//!
//! let adapter = VisemeAdapter::builder()
//!     .sample_rate(48_000)
//!     .build()?;
//!
//! adapter.on_init(instance, 0.3, None);
//!
//! let mut weights = [0.0f32; VISEME_COUNT];
//! adapter.on_frame(instance, &samples, FrameSource::Local, &mut weights, Some(|| done()));
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - ONNX Runtime backend
//! - `onnx` - ONNX Runtime backend; without it, supply a backend via
//!   [`VisemeAdapterBuilder::backend`]

/// Re-export of visemes-core for direct access
pub use visemes_core as core;

pub use visemes_core::{
    // Adapter
    AdapterConfig,
    AdapterStats,
    // Contexts
    AnalysisContext,
    AnalyzeOutcome,
    // Backends
    BackendCapabilities,
    BackendConfig,
    BackendFactory,
    CompatInterface,
    Completion,
    ContextState,
    FrameOutcome,
    FrameSource,
    InitDecision,
    InstanceId,
    LaughterPolicy,
    NativeLipSync,
    ProcessResult,
    RetryPolicy,
    StateTable,
    // Weights
    Viseme,
    VisemeAdapter,
    VisemeBackend,
    VisemeWeights,
    LAUGHTER_INDEX,
    SILENCE_THRESHOLD,
    VISEME_COUNT,
};

pub use visemes_core::backend_factory;

// ONNX Runtime backend
#[cfg(feature = "onnx")]
pub use visemes_onnx as onnx;

#[cfg(feature = "onnx")]
pub use visemes_onnx::{onnx_backend_factory, OnnxBackend, OnnxOptions};

pub mod error;
pub use error::{Error, Result};

pub mod logging;

mod builder;
pub use builder::{VisemeAdapterBuilder, VisemeAdapterExt};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{VisemeAdapterBuilder, VisemeAdapterExt};

    pub use crate::core::{
        AdapterConfig, FrameOutcome, FrameSource, InitDecision, InstanceId, LaughterPolicy,
        NativeLipSync, RetryPolicy, Viseme, VisemeAdapter, VisemeBackend, VisemeWeights,
        VISEME_COUNT,
    };

    #[cfg(feature = "onnx")]
    pub use crate::onnx::OnnxOptions;
}
