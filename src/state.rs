//! The realizable-state core shared by every kind of promise.
use crate::gate::{Gate, Passage};
use crate::listener::{invoke, FailureListener, ListenerKind, SuccessListener};
use crate::options::Options;
use crate::outcome::Outcome;
use crate::Error;
use parking_lot::{Condvar, Mutex};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::task::{Poll, Waker};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Outcome cell, gate and listener queues of one promise.
///
/// Realization happens at most once: `claimed` is flipped with a
/// compare-and-swap before the outcome is written, so concurrent realizers
/// cannot both get through. Listener appends and the dispatch loop share the
/// `listeners` lock; once the loop finds the queue empty it marks it
/// `drained` and later listeners run on the registering thread instead.
/// A registrar that shows up on another thread while the loop is still
/// running waits on `dispatch_done` for it, then runs its listener inline.
pub struct Core<T> {
    options: Options,
    claimed: AtomicBool,
    outcome: OnceLock<Outcome<T>>,
    listeners: Mutex<Listeners<T>>,
    dispatch_done: Condvar,
    gate: Gate,
}

struct Listeners<T> {
    success: Vec<SuccessListener<T>>,
    failure: Vec<FailureListener>,
    wakers: Vec<Waker>,
    dispatcher: Option<ThreadId>,
    drained: bool,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            failure: Vec::new(),
            wakers: Vec::new(),
            dispatcher: None,
            drained: false,
        }
    }
}

impl<T> Core<T> {
    pub(crate) fn new(options: Options) -> Self {
        Self {
            options,
            claimed: AtomicBool::new(false),
            outcome: OnceLock::new(),
            listeners: Mutex::new(Listeners::default()),
            dispatch_done: Condvar::new(),
            gate: Gate::new(),
        }
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn outcome(&self) -> Option<&Outcome<T>> {
        self.outcome.get()
    }

    pub(crate) fn is_realized(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Whether some realizer has already won the race, even if it has not
    /// finished writing the outcome yet.
    pub(crate) fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    fn realized(&self) -> Result<&Outcome<T>, Error> {
        self.outcome.get().ok_or(Error::NotRealized)
    }

    pub(crate) fn wait(&self) -> Result<&Outcome<T>, Error> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome);
        }
        match self.gate.wait() {
            Passage::Interrupted => Err(Error::Interrupted),
            Passage::Open | Passage::TimedOut => self.realized(),
        }
    }

    /// `Ok(None)` when the timeout elapsed first.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Result<Option<&Outcome<T>>, Error> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(Some(outcome));
        }
        match self.gate.wait_timeout(timeout) {
            Passage::Open => self.realized().map(Some),
            Passage::TimedOut => Ok(None),
            Passage::Interrupted => Err(Error::Interrupted),
        }
    }

    pub(crate) fn interrupt_waiters(&self) {
        self.gate.interrupt();
    }

    /// Realizes the promise and dispatches the matching listeners on the
    /// calling thread.
    ///
    /// Fails with [`Error::AlreadyRealized`] if another realizer got there
    /// first; `outcome` is dropped in that case.
    pub(crate) fn realize(&self, outcome: Outcome<T>) -> Result<&Outcome<T>, Error> {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRealized);
        }
        let outcome = self.outcome.get_or_init(move || outcome);
        self.gate.open();

        let wakers = {
            let mut listeners = self.listeners.lock();
            listeners.dispatcher = Some(thread::current().id());
            mem::take(&mut listeners.wakers)
        };
        for waker in wakers {
            waker.wake();
        }

        let dispatched = match outcome {
            Outcome::Success(value) => self.drain(
                |listeners| mem::take(&mut listeners.success),
                |callback| invoke(callback, value, ListenerKind::Success, &self.options),
            ),
            Outcome::Failure(cause) => self.drain(
                |listeners| mem::take(&mut listeners.failure),
                |callback| invoke(callback, cause, ListenerKind::Failure, &self.options),
            ),
        };
        tracing::trace!(
            label = self.options.label().unwrap_or_default(),
            outcome = outcome.kind(),
            dispatched,
            "promise realized"
        );
        Ok(outcome)
    }

    /// Realizes with a parent's outcome. Losing the race to another realizer
    /// is expected and only logged.
    pub(crate) fn forward(&self, outcome: Outcome<T>) {
        if self.realize(outcome).is_err() {
            tracing::debug!(
                label = self.options.label().unwrap_or_default(),
                "parent outcome arrived after the promise was realized"
            );
        }
    }

    /// Runs queued listeners batch by batch, outside the lock, until a batch
    /// comes back empty. Listeners added meanwhile land in the next batch, so
    /// registration order holds across batches.
    fn drain<L>(
        &self,
        take: impl Fn(&mut Listeners<T>) -> Vec<L>,
        mut call: impl FnMut(L),
    ) -> usize {
        let mut dispatched = 0;
        loop {
            let batch = {
                let mut listeners = self.listeners.lock();
                let batch = take(&mut *listeners);
                if batch.is_empty() {
                    listeners.drained = true;
                    listeners.success.clear();
                    listeners.failure.clear();
                    self.dispatch_done.notify_all();
                    break;
                }
                batch
            };
            dispatched += batch.len();
            batch.into_iter().for_each(&mut call);
        }
        dispatched
    }

    /// Queues `listener` while the promise is pending, or while the calling
    /// thread is the one dispatching. Otherwise waits for any dispatch in
    /// flight and hands the listener back to be run inline.
    fn enqueue<L>(
        &self,
        listener: L,
        queue: impl FnOnce(&mut Listeners<T>) -> &mut Vec<L>,
    ) -> Option<L> {
        let mut listeners = self.listeners.lock();
        if listeners.drained {
            return Some(listener);
        }
        if self.outcome.get().is_none() || listeners.dispatcher == Some(thread::current().id()) {
            queue(&mut *listeners).push(listener);
            return None;
        }
        while !listeners.drained {
            self.dispatch_done.wait(&mut listeners);
        }
        Some(listener)
    }

    pub(crate) fn add_success(&self, listener: SuccessListener<T>) {
        let Some(listener) = self.enqueue(listener, |listeners| &mut listeners.success) else {
            return;
        };
        if let Some(Outcome::Success(value)) = self.outcome.get() {
            invoke(listener, value, ListenerKind::Success, &self.options);
        }
    }

    pub(crate) fn add_failure(&self, listener: FailureListener) {
        let Some(listener) = self.enqueue(listener, |listeners| &mut listeners.failure) else {
            return;
        };
        if let Some(Outcome::Failure(cause)) = self.outcome.get() {
            invoke(listener, cause, ListenerKind::Failure, &self.options);
        }
    }

    /// Ready once realized; otherwise remembers `waker` for realization.
    pub(crate) fn poll_realized(&self, waker: &Waker) -> Poll<&Outcome<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome);
        }
        let mut listeners = self.listeners.lock();
        // The realizer writes the outcome before it takes the wakers, so a
        // second look under the lock cannot miss a wakeup.
        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome);
        }
        if !listeners.wakers.iter().any(|known| known.will_wake(waker)) {
            listeners.wakers.push(waker.clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::Core;
    use crate::options::Options;
    use crate::outcome::{into_cause, Outcome};
    use crate::{Cause, Error};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn fresh<T>() -> Core<T> {
        Core::new(Options::default())
    }

    #[test]
    fn realizes_once() {
        let core = fresh::<u32>();
        assert!(!core.is_realized());
        assert!(core.realize(Outcome::Success(1)).is_ok());
        assert!(matches!(
            core.realize(Outcome::Success(2)),
            Err(Error::AlreadyRealized)
        ));
        assert!(matches!(
            core.realize(Outcome::Failure(into_cause("late"))),
            Err(Error::AlreadyRealized)
        ));
        assert_eq!(core.outcome().and_then(Outcome::success), Some(&1));
    }

    #[test]
    fn queued_listeners_fire_in_order_on_realization() {
        let core = fresh::<&'static str>();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..5 {
            let log = log.clone();
            core.add_success(Box::new(move |value: &&str| log.lock().push(format!("{id}:{value}"))));
        }
        core.add_failure(Box::new(|_: &Cause| panic!("failure listener must not run")));
        assert!(log.lock().is_empty());

        core.realize(Outcome::Success("ok")).unwrap();
        assert_eq!(*log.lock(), vec!["0:ok", "1:ok", "2:ok", "3:ok", "4:ok"]);
    }

    #[test]
    fn late_listeners_fire_immediately() {
        let core = fresh::<u8>();
        core.realize(Outcome::Failure(into_cause("nope"))).unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = hits.clone();
        core.add_failure(Box::new(move |cause: &Cause| sink.lock().push(cause.to_string())));
        core.add_success(Box::new(|_: &u8| panic!("success listener must not run")));
        assert_eq!(*hits.lock(), vec!["nope"]);
    }

    #[test]
    fn listener_added_during_dispatch_runs_after_earlier_ones() {
        let core = Arc::new(fresh::<u8>());
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            let inner_core = Arc::downgrade(&core);
            core.add_success(Box::new(move |_: &u8| {
                log.lock().push("first");
                let log = log.clone();
                if let Some(core) = inner_core.upgrade() {
                    core.add_success(Box::new(move |_: &u8| log.lock().push("nested")));
                }
            }));
        }
        {
            let log = log.clone();
            core.add_success(Box::new(move |_: &u8| log.lock().push("second")));
        }
        core.realize(Outcome::Success(0)).unwrap();
        assert_eq!(*log.lock(), vec!["first", "second", "nested"]);
    }

    #[test]
    fn wait_timeout_reports_elapsed() {
        let core = fresh::<u8>();
        assert!(core.wait_timeout(Duration::from_millis(10)).unwrap().is_none());
        core.realize(Outcome::Success(3)).unwrap();
        let outcome = core.wait_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(outcome.and_then(Outcome::success), Some(&3));
    }

    #[test]
    fn concurrent_realizers_have_one_winner() {
        let core = Arc::new(fresh::<usize>());
        let realizers: Vec<_> = (0..8)
            .map(|id| {
                let core = core.clone();
                thread::spawn(move || core.realize(Outcome::Success(id)).is_ok())
            })
            .collect();
        let winners = realizers
            .into_iter()
            .map(|realizer| realizer.join().expect("A realizer thread has panicked"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(core.wait().unwrap().is_success());
    }
}
