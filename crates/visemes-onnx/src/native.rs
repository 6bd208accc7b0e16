//! ONNX Runtime shared library discovery and one-time load.
//!
//! The runtime is looked up in a fixed candidate order and loaded at most once per process.
//! The first candidate that exists and loads wins; it stays resident until the process exits.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use visemes_core::{Error, Result};

/// Runtime library file name for the current platform.
pub fn library_name() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("libonnxruntime.so")
    } else if cfg!(target_os = "windows") {
        Some("onnxruntime.dll")
    } else if cfg!(target_os = "macos") {
        Some("libonnxruntime.dylib")
    } else {
        None
    }
}

/// Runtime identifier folder used by `runtimes/<rid>/native/` layouts.
pub fn rid_folder() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("linux-x64")
    } else if cfg!(target_os = "windows") {
        Some("win-x64")
    } else if cfg!(target_os = "macos") {
        Some("osx-x64")
    } else {
        None
    }
}

/// Directories searched for the runtime library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    /// Directory next to the host application. Defaults to the executable's directory.
    pub module_dir: Option<PathBuf>,
    /// Process base directory. Defaults to the working directory.
    pub base_dir: Option<PathBuf>,
}

impl SearchRoots {
    pub fn new(module_dir: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: Some(module_dir.into()),
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolved_module_dir(&self) -> Option<PathBuf> {
        self.module_dir.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
    }

    fn resolved_base_dir(&self) -> Option<PathBuf> {
        self.base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
    }
}

/// Candidate paths in search order.
pub fn candidate_paths(
    module_dir: Option<&Path>,
    base_dir: Option<&Path>,
    lib: &str,
    rid: Option<&str>,
) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(dir) = module_dir {
        candidates.push(dir.join(lib));
        candidates.push(dir.join("onnx").join(lib));
    }
    if let Some(dir) = base_dir {
        candidates.push(dir.join(lib));
        if let Some(rid) = rid {
            candidates.push(dir.join("runtimes").join(rid).join("native").join(lib));
        }
    }
    candidates
}

struct NativeRuntime {
    path: PathBuf,
    // Keeps the runtime mapped for the life of the process.
    _library: libloading::Library,
}

static RUNTIME: Mutex<Option<NativeRuntime>> = parking_lot::const_mutex(None);

/// Path of the resident runtime library, if one was loaded.
pub fn loaded_path() -> Option<PathBuf> {
    RUNTIME.lock().as_ref().map(|rt| rt.path.clone())
}

pub fn is_loaded() -> bool {
    RUNTIME.lock().is_some()
}

/// Loads the runtime library unless it is already resident. Returns the loaded path.
///
/// Failed attempts keep nothing loaded, so a later call searches again.
pub fn ensure_loaded(roots: &SearchRoots) -> Result<PathBuf> {
    let mut slot = RUNTIME.lock();
    if let Some(runtime) = slot.as_ref() {
        return Ok(runtime.path.clone());
    }

    let lib = library_name().ok_or_else(|| Error::NativeLibrary {
        searched: Vec::new(),
        reason: "unsupported platform".into(),
    })?;

    let candidates = candidate_paths(
        roots.resolved_module_dir().as_deref(),
        roots.resolved_base_dir().as_deref(),
        lib,
        rid_folder(),
    );

    let mut failures = Vec::new();
    for path in &candidates {
        if !path.is_file() {
            tracing::debug!("ONNX native candidate not found: {}", path.display());
            continue;
        }

        let library = match unsafe { libloading::Library::new(path) } {
            Ok(library) => library,
            Err(e) => {
                tracing::warn!("Failed to load ONNX native '{}': {}", path.display(), e);
                failures.push(format!("{}: {}", path.display(), e));
                continue;
            }
        };

        if let Err(reason) = init_environment(path) {
            tracing::warn!("Failed to initialize ONNX Runtime from '{}': {}", path.display(), reason);
            failures.push(format!("{}: {}", path.display(), reason));
            continue;
        }

        tracing::info!("Loaded ONNX Runtime native library: {}", path.display());
        *slot = Some(NativeRuntime {
            path: path.clone(),
            _library: library,
        });
        return Ok(path.clone());
    }

    tracing::warn!(
        "ONNX Runtime native library was not found. Place {} next to the host application or under 'onnx/'.",
        lib
    );
    let reason = if failures.is_empty() {
        format!("{} not found", lib)
    } else {
        failures.join("; ")
    };
    Err(Error::NativeLibrary {
        searched: candidates,
        reason,
    })
}

fn init_environment(path: &Path) -> std::result::Result<(), String> {
    let builder = ort::init_from(path.to_string_lossy());
    builder.with_name("visemes").commit().into_status()
}

/// Normalizes what committing the ONNX Runtime environment reports.
///
/// A `false` flag means a global environment already existed, which is usable.
trait CommitStatus {
    fn into_status(self) -> std::result::Result<(), String>;
}

impl CommitStatus for bool {
    fn into_status(self) -> std::result::Result<(), String> {
        if !self {
            tracing::debug!("ONNX Runtime environment was already committed");
        }
        Ok(())
    }
}

impl<T, E: std::fmt::Display> CommitStatus for std::result::Result<T, E> {
    fn into_status(self) -> std::result::Result<(), String> {
        self.map(|_| ())
            .map_err(|e| format!("environment commit failed: {e}"))
    }
}
