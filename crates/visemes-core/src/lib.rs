//! Viseme inference adapter core.
//!
//! Turns live audio frames into 16-value viseme weight vectors for host instances that lack a
//! usable native lip-sync engine.
//!
//! # Primary API
//!
//! - [`VisemeAdapter`]: the host entry points (`on_init`, `on_smoothing_change`, `on_frame`,
//!   `on_dispose`)
//! - [`VisemeBackend`] / [`BackendFactory`]: pluggable inference runtimes
//! - [`AnalysisContext`]: one live inference session with smoothing
//! - [`CompatInterface`]: fixed host call shape over a backend
//! - [`AdapterConfig`]: TOML-loadable configuration
//!
//! # Example
//!
//! ```ignore
//! use visemes_core::*;
//!
//! let adapter = VisemeAdapter::new(AdapterConfig::default(), factory);
//! adapter.on_init(id, 0.3, None);
//!
//! let mut out = [0.0f32; VISEME_COUNT];
//! adapter.on_frame(id, &samples, FrameSource::Local, &mut out, Some(|| ready()));
//! ```

pub mod error;
pub use error::{Error, Result};

/// Stable identifier of a host instance.
pub type InstanceId = u64;

pub mod audio;
pub use audio::{is_silent, peak, SILENCE_THRESHOLD};

pub mod viseme;
pub use viseme::{write_silence, LaughterPolicy, Viseme, VisemeWeights, LAUGHTER_INDEX, VISEME_COUNT};

pub mod backend;
pub use backend::{
    backend_factory, BackendCapabilities, BackendConfig, BackendFactory, VisemeBackend,
    DEFAULT_FRAME_SIZE, DEFAULT_MODEL_PATH, DEFAULT_SAMPLE_RATE,
};

pub mod completion;
pub use completion::Completion;

pub mod interface;
pub use interface::{CompatInterface, ProcessResult};

pub mod context;
pub use context::{clamp_smoothing, AnalysisContext, AnalyzeOutcome, ContextState, MAX_SMOOTHING};

pub mod table;
pub use table::StateTable;

pub mod config;
pub use config::{AdapterConfig, RetryPolicy};

pub(crate) mod lockfree;
pub use lockfree::{AtomicCounter, AtomicFlag};

mod stats;
pub use stats::AdapterStats;

pub mod adapter;
pub use adapter::{FrameOutcome, FrameSource, InitDecision, NativeLipSync, VisemeAdapter};
