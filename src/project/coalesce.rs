//! Run coalescing for reloads.
//!
//! At most one run is in flight. Requests that arrive meanwhile collapse
//! into a single pending re-run, which starts after the current run has
//! fully settled.

use parking_lot::Mutex;

/// What a caller of [`Coalescer::begin`] should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Nothing was running; the caller runs now and owns the loop.
    Run,
    /// A run is in flight; a re-run has been scheduled.
    Scheduled,
}

#[derive(Debug, Default)]
struct State {
    running: bool,
    pending: bool,
}

#[derive(Debug, Default)]
pub struct Coalescer {
    state: Mutex<State>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Admission {
        let mut state = self.state.lock();
        if state.running {
            state.pending = true;
            Admission::Scheduled
        } else {
            state.running = true;
            Admission::Run
        }
    }

    /// Called by the owner after each run. Returns true if it must run again.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        if state.pending {
            state.pending = false;
            true
        } else {
            state.running = false;
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Run `job` under coalescing.
    ///
    /// Returns `None` if the request was folded into a pending re-run,
    /// otherwise the result of the last run.
    pub fn run<T>(&self, mut job: impl FnMut() -> T) -> Option<T> {
        if self.begin() == Admission::Scheduled {
            return None;
        }
        loop {
            let result = job();
            if !self.finish() {
                return Some(result);
            }
        }
    }
}
