//! One-shot gate: closed at creation, opened exactly once, after which every
//! waiter passes straight through.
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub(crate) struct Gate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    /// Bumped by every interrupt. A waiter that sees it move gives up.
    interrupts: u64,
}

/// How a wait on the gate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Passage {
    Open,
    TimedOut,
    Interrupted,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self) {
        let mut state = self.state.lock();
        state.open = true;
        self.condvar.notify_all();
    }

    /// Wakes every thread currently blocked on a closed gate with
    /// [`Passage::Interrupted`]. Later waiters are unaffected.
    pub(crate) fn interrupt(&self) {
        let mut state = self.state.lock();
        if !state.open {
            state.interrupts = state.interrupts.wrapping_add(1);
            self.condvar.notify_all();
        }
    }

    pub(crate) fn wait(&self) -> Passage {
        let mut state = self.state.lock();
        let ticket = state.interrupts;
        while !state.open {
            if state.interrupts != ticket {
                return Passage::Interrupted;
            }
            self.condvar.wait(&mut state);
        }
        Passage::Open
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Passage {
        // A deadline too far out to represent means waiting forever.
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        let ticket = state.interrupts;
        while !state.open {
            if state.interrupts != ticket {
                return Passage::Interrupted;
            }
            match deadline {
                Some(deadline) => {
                    let result = self.condvar.wait_until(&mut state, deadline);
                    if result.timed_out() && !state.open && state.interrupts == ticket {
                        return Passage::TimedOut;
                    }
                }
                None => self.condvar.wait(&mut state),
            }
        }
        Passage::Open
    }
}
