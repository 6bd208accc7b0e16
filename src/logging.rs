//! Log output setup.
//!
//! Library code only emits `tracing` events. Hosts that do not install their own subscriber can
//! call [`init`] once at startup.

use tracing::Level;

/// Set to `1` (or `true`, `yes`, `on`) for debug-level output.
pub const DEBUG_ENV: &str = "VISEMES_DEBUG";

/// Whether [`DEBUG_ENV`] asks for debug output.
pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// The level [`init`] installs.
pub fn level() -> Level {
    if debug_enabled() {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Installs a `fmt` subscriber at [`level`].
///
/// Returns false if a global subscriber was already set; calling it twice is harmless.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level())
        .with_target(false)
        .try_init()
        .is_ok()
}
