//! Per-run cancellation tokens for executors.

use super::CancellationToken;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RunState {
    latest: Arc<CancellationToken>,
    active: Vec<Arc<CancellationToken>>,
}

/// The cancellation tokens of an executor's runs.
///
/// Every run gets a fresh token, so starting a run never clears a
/// cancellation aimed at another run that is still in flight.
#[derive(Debug, Default)]
pub struct RunTokens {
    state: Mutex<RunState>,
}

impl RunTokens {
    /// Creates an empty set of run tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run with its own token.
    ///
    /// The token stays registered until the returned guard is dropped.
    pub fn begin(&self) -> RunGuard<'_> {
        let token = Arc::new(CancellationToken::new());
        let mut state = self.state.lock();
        state.latest = Arc::clone(&token);
        state.active.push(Arc::clone(&token));
        RunGuard {
            runs: self,
            token,
        }
    }

    /// Cancels every run in flight, and the most recent run.
    pub fn cancel(&self, reason: &str) {
        let state = self.state.lock();
        for token in &state.active {
            token.cancel(reason);
        }
        state.latest.cancel(reason);
    }

    /// Returns true if the most recent run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().latest.is_cancelled()
    }

    /// Number of runs in flight.
    #[must_use]
    pub fn active(&self) -> usize {
        self.state.lock().active.len()
    }

    fn finish(&self, token: &Arc<CancellationToken>) {
        self.state
            .lock()
            .active
            .retain(|active| !Arc::ptr_eq(active, token));
    }
}

/// Registration of one run; unregisters the run's token on drop.
#[derive(Debug)]
pub struct RunGuard<'a> {
    runs: &'a RunTokens,
    token: Arc<CancellationToken>,
}

impl RunGuard<'_> {
    /// This run's token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs.finish(&self.token);
    }
}
