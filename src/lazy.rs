//! Promises computed on demand by their first consumer.
use crate::callable::Computation;
use crate::options::Options;
use crate::realizable::{Realizable, Strategy};
use crate::state::Core;
use crate::Error;

/// Strategy of a promise whose computation runs inline, on the thread that
/// first waits for it.
#[derive(Debug)]
pub struct Inline<T> {
    computation: Computation<T>,
}

impl<T: Send + Sync + 'static> Strategy<T> for Inline<T> {
    fn prepare(&self, core: &Core<T>) {
        if core.is_claimed() || self.computation.has_started() {
            return;
        }
        match self.computation.execute(core) {
            Ok(_) | Err(Error::Failed(_)) => tracing::trace!(
                label = core.options().label().unwrap_or_default(),
                "lazy promise computed inline"
            ),
            // Another consumer or the parent won the race; waiting on the
            // core covers both.
            Err(_) => {}
        }
    }

    fn supports_timeout(&self) -> bool {
        false
    }
}

/// A promise whose computation is deferred until someone waits for it.
///
/// The first [`wait`] or [`get`] runs the computation on the calling thread;
/// everyone else sees the memoized outcome. Consumers that arrive while the
/// computation is running block until it finishes. Since the work happens
/// inline there is nothing to time out, so [`wait_timeout`] and
/// [`get_timeout`] always fail with [`Error::Unsupported`].
///
/// If the computation panics, the consumer that ran it unwinds; the promise
/// is realized with a [`ComputationPanicked`](crate::ComputationPanicked)
/// failure, which every other consumer gets as [`Error::Failed`].
///
/// # Examples
///
/// ```
/// use pledge::{Error, LazyPromise, Promise};
/// use std::time::Duration;
///
/// let promise = LazyPromise::new(|| Ok::<_, Error>(6 * 7));
/// assert!(!promise.is_realized());
/// assert_eq!(*promise.get().unwrap(), 42);
/// assert!(matches!(promise.get_timeout(Duration::from_secs(1)), Err(Error::Unsupported)));
/// ```
///
/// [`wait`]: crate::Promise::wait
/// [`get`]: crate::Promise::get
/// [`wait_timeout`]: crate::Promise::wait_timeout
/// [`get_timeout`]: crate::Promise::get_timeout
pub type LazyPromise<T> = Realizable<T, Inline<T>>;

impl<T> Realizable<T, Inline<T>>
where
    T: Send + Sync + 'static,
{
    pub fn new<F, E>(computation: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::with_options(Options::default(), computation)
    }

    pub fn with_options<F, E>(options: Options, computation: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::from_parts(
            options,
            Inline {
                computation: Computation::new(computation),
            },
        )
    }

    /// Whether the computation has been started by some consumer.
    pub fn has_started(&self) -> bool {
        self.strategy().computation.has_started()
    }
}
