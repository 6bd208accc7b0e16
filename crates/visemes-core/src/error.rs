//! Error types for visemes-core.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for viseme inference operations.
///
/// Construction-time variants (`NativeLibrary`, `ModelLoad`, `InterfaceInit`) leave an
/// instance without a usable context. `Inference` is recovered per frame.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Inference runtime library unavailable: {reason} (searched {})", display_paths(.searched))]
    NativeLibrary {
        searched: Vec<PathBuf>,
        reason: String,
    },

    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Compatibility interface initialization failed: {0}")]
    InterfaceInit(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable tag used in log lines so repeated failures can be grepped and deduplicated.
    pub fn tag(&self) -> &'static str {
        match self {
            Error::NativeLibrary { .. } => "native-library",
            Error::ModelLoad { .. } => "model-load",
            Error::InterfaceInit(_) => "interface-init",
            Error::Inference(_) => "inference",
            Error::InvalidConfig(_) => "invalid-config",
            Error::Io(_) => "io",
        }
    }

    /// True for failures that prevent a context from ever reaching `Ready`.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Error::NativeLibrary { .. } | Error::ModelLoad { .. } | Error::InterfaceInit(_)
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
