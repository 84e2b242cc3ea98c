//! The concrete promise type.
use crate::future::Realized;
use crate::options::Options;
use crate::outcome::{Cause, Outcome, UpstreamFailure};
use crate::state::Core;
use crate::{Error, Promise};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How a promise gets realized. Chosen once, at construction.
///
/// Implemented by [`Manual`](crate::deliverable::Manual),
/// [`Computation`](crate::callable::Computation) and
/// [`Inline`](crate::lazy::Inline).
pub trait Strategy<T>: Send + Sync + 'static {
    /// Runs before every wait. Lazy promises do their work here.
    fn prepare(&self, _core: &Core<T>) {}

    fn supports_timeout(&self) -> bool {
        true
    }
}

/// A single-assignment promise realized according to strategy `S`.
///
/// Cloning is cheap and every clone observes the same promise.
pub struct Realizable<T, S> {
    shared: Arc<Shared<T, S>>,
}

struct Shared<T, S> {
    core: Core<T>,
    strategy: S,
}

impl<T, S> Clone for Realizable<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, S> Realizable<T, S> {
    pub(crate) fn from_parts(options: Options, strategy: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                core: Core::new(options),
                strategy,
            }),
        }
    }

    pub(crate) fn core(&self) -> &Core<T> {
        &self.shared.core
    }

    pub(crate) fn strategy(&self) -> &S {
        &self.shared.strategy
    }

    pub fn options(&self) -> &Options {
        self.core().options()
    }

    pub fn label(&self) -> Option<&str> {
        self.options().label()
    }

    /// The outcome, if realized. Never blocks.
    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.core().outcome()
    }

    /// Makes every thread currently blocked in a wait on this promise return
    /// [`Error::Interrupted`]. The promise itself is left pending.
    pub fn interrupt_waiters(&self) {
        self.core().interrupt_waiters();
    }
}

impl<T, S> Realizable<T, S>
where
    T: Send + Sync + 'static,
    S: Strategy<T>,
{
    /// A future that resolves once the promise is realized.
    ///
    /// For a [`LazyPromise`](crate::LazyPromise) the first poll runs the
    /// computation inline, blocking the executor thread until it finishes.
    /// Hand such work to a blocking pool, or use a
    /// [`CallablePromise`](crate::CallablePromise) driven by a runner.
    pub fn realized(&self) -> Realized<'_, T, S> {
        Realized::new(self)
    }

    /// Subscribes this promise to `parent`: a parent value is forwarded as is,
    /// a parent failure becomes an [`UpstreamFailure`].
    ///
    /// The parent only holds a weak reference to this promise. Whichever
    /// realizer comes first wins; a parent outcome arriving late is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use pledge::{DeliverablePromise, Promise};
    ///
    /// let parent = DeliverablePromise::<String>::new();
    /// let child = DeliverablePromise::new().following(&parent);
    /// parent.deliver("hello".into()).unwrap();
    /// assert_eq!(child.get().unwrap(), "hello");
    /// ```
    pub fn following<P>(self, parent: &P) -> Self
    where
        P: Promise<Output = T>,
        T: Clone,
    {
        let child = Arc::downgrade(&self.shared);
        parent.on_success(move |value: &T| {
            if let Some(shared) = child.upgrade() {
                shared.core.forward(Outcome::Success(value.clone()));
            }
        });
        let child = Arc::downgrade(&self.shared);
        parent.on_failure(move |cause: &Cause| {
            if let Some(shared) = child.upgrade() {
                let wrapped: Cause = Arc::new(UpstreamFailure::new(cause.clone()));
                shared.core.forward(Outcome::Failure(wrapped));
            }
        });
        self
    }
}

impl<T, S> Promise for Realizable<T, S>
where
    T: Send + Sync + 'static,
    S: Strategy<T>,
{
    type Output = T;

    fn is_realized(&self) -> bool {
        self.core().is_realized()
    }

    fn is_success(&self) -> Result<bool, Error> {
        self.outcome()
            .map(Outcome::is_success)
            .ok_or(Error::NotRealized)
    }

    fn wait(&self) -> Result<(), Error> {
        self.strategy().prepare(self.core());
        self.core().wait().map(drop)
    }

    fn wait_timeout(&self, timeout: Duration) -> Result<bool, Error> {
        if !self.strategy().supports_timeout() {
            return Err(Error::Unsupported);
        }
        self.core()
            .wait_timeout(timeout)
            .map(|outcome| outcome.is_some())
    }

    fn get(&self) -> Result<&T, Error> {
        self.strategy().prepare(self.core());
        self.core().wait()?.as_result()
    }

    fn get_timeout(&self, timeout: Duration) -> Result<&T, Error> {
        if !self.strategy().supports_timeout() {
            return Err(Error::Unsupported);
        }
        self.core()
            .wait_timeout(timeout)?
            .ok_or(Error::TimedOut)?
            .as_result()
    }

    fn on_success<F>(&self, listener: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.core().add_success(Box::new(listener));
    }

    fn on_failure<F>(&self, listener: F)
    where
        F: FnOnce(&Cause) + Send + 'static,
    {
        self.core().add_failure(Box::new(listener));
    }
}

impl<T: fmt::Debug, S> fmt::Debug for Realizable<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realizable")
            .field("label", &self.label())
            .field("outcome", &self.outcome())
            .finish()
    }
}
