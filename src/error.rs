//! Centralized error type for the visemes umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] visemes_core::Error),

    #[error("No inference backend configured; enable the `onnx` feature or call `backend()`")]
    NoBackend,
}

pub type Result<T> = std::result::Result<T, Error>;
