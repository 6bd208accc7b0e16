//! ONNX Runtime backend for visemes.
//!
//! - [`native`]: finds and loads the ONNX Runtime shared library once per process
//! - [`model`]: model sidecar metadata, session creation, output decoding
//! - [`resample`]: host rate → model rate streaming resampler and rolling window
//! - [`OnnxBackend`]: the [`VisemeBackend`](visemes_core::VisemeBackend) implementation
//!
//! # Example
//!
//! ```ignore
//! use visemes_onnx::{onnx_backend_factory, OnnxOptions};
//!
//! let factory = onnx_backend_factory(OnnxOptions::default());
//! let adapter = visemes_core::VisemeAdapter::new(config, factory);
//! ```

pub mod backend;
pub mod model;
pub mod native;
pub mod resample;

pub use backend::{OnnxBackend, OnnxOptions};
pub use model::{Activation, ModelIo, DEFAULT_MODEL_SAMPLE_RATE, DEFAULT_WINDOW};
pub use native::SearchRoots;

use visemes_core::{backend_factory, BackendFactory, VisemeBackend};

/// A factory that builds an [`OnnxBackend`] per context.
pub fn onnx_backend_factory(options: OnnxOptions) -> BackendFactory {
    backend_factory(move |config| {
        OnnxBackend::initialize(config, &options).map(|b| Box::new(b) as Box<dyn VisemeBackend>)
    })
}
