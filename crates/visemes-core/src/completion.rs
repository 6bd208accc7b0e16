//! Exactly-once completion signal for frame calls.

/// Wraps the host's optional "done" callback so it fires at most once.
///
/// The host's frame pipeline stalls if a frame is never completed, so every frame path ends by
/// calling [`signal`](Self::signal); repeated calls are no-ops.
pub struct Completion<F: FnOnce()> {
    callback: Option<F>,
    signaled: bool,
}

impl<F: FnOnce()> Completion<F> {
    pub fn new(callback: Option<F>) -> Self {
        Self {
            callback,
            signaled: false,
        }
    }

    pub fn signal(&mut self) {
        if self.signaled {
            return;
        }
        self.signaled = true;
        if let Some(cb) = self.callback.take() {
            cb();
        }
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled
    }
}

impl Completion<fn()> {
    /// A completion with no callback attached.
    pub fn none() -> Self {
        Self::new(None)
    }
}
