//! Cooperative pause/stop signal for a running sync.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPED: u8 = 2;

/// State requested by the controller of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Running,
    /// Stop at the next batch boundary and record a checkpoint.
    Paused,
    /// Stop at the next batch boundary without a checkpoint.
    Stopped,
}

/// Shared handle the controller sets and the engine reads at batch boundaries.
///
/// Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SyncSignal {
    state: Arc<AtomicU8>,
}

impl SyncSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause. Has no effect once stopped.
    pub fn pause(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, PAUSED, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.state.store(RUNNING, Ordering::SeqCst);
    }

    pub fn state(&self) -> SignalState {
        match self.state.load(Ordering::SeqCst) {
            PAUSED => SignalState::Paused,
            STOPPED => SignalState::Stopped,
            _ => SignalState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SignalState::Running
    }
}
