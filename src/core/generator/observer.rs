//! Run observation hooks.

/// Receives progress and user-facing notices during a generation run.
///
/// Both methods default to doing nothing. Calls happen inline on the run's
/// task, so implementations should return quickly.
pub trait GenerationObserver: Send + Sync {
    /// `current` chunks of `total` have been started. `(0, total)` is sent once
    /// right after chunking.
    fn on_progress(&self, _current: usize, _total: usize) {}

    /// A short informational message, e.g. which key is in use.
    fn on_notice(&self, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}

/// Observer backed by closures.
pub struct FnObserver<P, N>
where
    P: Fn(usize, usize) + Send + Sync,
    N: Fn(&str) + Send + Sync,
{
    progress: P,
    notice: N,
}

impl<P, N> FnObserver<P, N>
where
    P: Fn(usize, usize) + Send + Sync,
    N: Fn(&str) + Send + Sync,
{
    pub fn new(progress: P, notice: N) -> Self {
        Self { progress, notice }
    }
}

impl<P, N> GenerationObserver for FnObserver<P, N>
where
    P: Fn(usize, usize) + Send + Sync,
    N: Fn(&str) + Send + Sync,
{
    fn on_progress(&self, current: usize, total: usize) {
        (self.progress)(current, total)
    }

    fn on_notice(&self, message: &str) {
        (self.notice)(message)
    }
}
