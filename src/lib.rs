//! Single-assignment promises.
//!
//! A promise holds a value that becomes available exactly once. After that,
//! every observer sees the same [`Outcome`] without blocking. Producers
//! realize a promise either with a value or with a failure [`Cause`].
//! Consumers can block on it ([`Promise::get`]), block with a timeout
//! ([`Promise::get_timeout`]), register listeners ([`Promise::on_success`],
//! [`Promise::on_failure`]) or `.await` it ([`Realizable::realized`]).
//!
//! There is one concrete promise type, [`Realizable`]. Its resolution strategy
//! is chosen when it is constructed:
//!
//! * [`DeliverablePromise`]: the producer calls [`deliver`] or [`fail`].
//! * [`CallablePromise`]: wraps a computation. Calling [`run`] (directly or
//!   through a task runner via [`into_task`]) realizes the promise.
//! * [`LazyPromise`]: wraps a computation that runs inline, at most once, the
//!   first time someone waits for the value.
//!
//! Any of them can also follow a parent promise ([`Realizable::following`]).
//!
//! Listeners run synchronously on the thread that realizes the promise, in
//! registration order. A listener registered after realization runs on the
//! registering thread before registration returns; if the realizing thread
//! is still dispatching, the registrar first waits for it to finish. The
//! exception is a listener registered from inside a listener of the same
//! promise: it is queued behind the current dispatch. Listeners must not
//! block: a slow listener holds up every listener queued after it, the
//! realizing thread, and late registrars. A panicking listener is caught and
//! reported to the promise's [`FaultSink`].
//!
//! # Examples
//!
//! ```
//! use pledge::{DeliverablePromise, Promise};
//! use std::thread;
//!
//! let promise = DeliverablePromise::<u32>::new();
//! let producer = promise.clone();
//! let task = thread::spawn(move || producer.deliver(42).unwrap());
//!
//! assert_eq!(*promise.get().unwrap(), 42);
//! task.join().expect("The producer thread has panicked");
//! ```
//!
//! [`deliver`]: Realizable::deliver
//! [`fail`]: Realizable::fail
//! [`run`]: Realizable::run
//! [`into_task`]: Realizable::into_task

use std::time::Duration;

pub mod callable;
pub mod deliverable;
pub mod future;
pub mod lazy;
pub mod listener;
pub mod options;
pub mod outcome;
pub mod realizable;

mod gate;
mod state;

pub use callable::CallablePromise;
pub use deliverable::DeliverablePromise;
pub use future::Realized;
pub use lazy::LazyPromise;
pub use listener::{FaultSink, ListenerFault, ListenerKind, TracingSink};
pub use options::{Builder, Options};
pub use outcome::{Cause, ComputationPanicked, Outcome, UpstreamFailure};
pub use realizable::Realizable;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The promise was realized with a failure.
    #[error("promise failed: {0}")]
    Failed(#[source] Cause),
    /// The waiting thread was interrupted through
    /// [`Realizable::interrupt_waiters`].
    #[error("interrupted while waiting for promise")]
    Interrupted,
    #[error("promise isn't realized yet")]
    NotRealized,
    #[error("promise is already realized")]
    AlreadyRealized,
    #[error("computation has already been run")]
    AlreadyRun,
    #[error("cannot support timeouts on inline promises")]
    Unsupported,
    #[error("timed out waiting for promise")]
    TimedOut,
}

impl Error {
    /// The failure cause, if this error reports a realized failure.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Error::Failed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// What every promise offers its consumers.
pub trait Promise {
    type Output;

    /// Whether the promise has been realized. Never blocks.
    fn is_realized(&self) -> bool;

    /// Whether the promise was realized with a value.
    ///
    /// Fails with [`Error::NotRealized`] while the promise is pending.
    fn is_success(&self) -> Result<bool, Error>;

    /// Whether the promise was realized with a failure.
    ///
    /// Fails with [`Error::NotRealized`] while the promise is pending.
    fn is_failure(&self) -> Result<bool, Error> {
        self.is_success().map(|success| !success)
    }

    /// Blocks until the promise is realized.
    fn wait(&self) -> Result<(), Error>;

    /// Blocks until the promise is realized or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout; the promise may still be realized
    /// later.
    fn wait_timeout(&self, timeout: Duration) -> Result<bool, Error>;

    /// Blocks until the promise is realized, then returns its value or
    /// [`Error::Failed`] with the failure cause.
    fn get(&self) -> Result<&Self::Output, Error>;

    /// Like [`get`](Promise::get), but gives up with [`Error::TimedOut`] once
    /// `timeout` elapses.
    fn get_timeout(&self, timeout: Duration) -> Result<&Self::Output, Error>;

    /// Registers a listener that runs once the promise succeeds.
    ///
    /// On a realized promise the listener runs before this returns, after
    /// any dispatch still in flight on the realizing thread.
    fn on_success<F>(&self, listener: F)
    where
        F: FnOnce(&Self::Output) + Send + 'static;

    /// Registers a listener that runs once the promise fails.
    ///
    /// Runs inline on a realized promise, like [`on_success`](Promise::on_success).
    fn on_failure<F>(&self, listener: F)
    where
        F: FnOnce(&Cause) + Send + 'static;
}
