//! Promises realized by running a computation.
use crate::listener::panic_message;
use crate::options::Options;
use crate::outcome::{into_cause, Cause, ComputationPanicked, Outcome};
use crate::realizable::{Realizable, Strategy};
use crate::state::Core;
use crate::Error;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Task<T> = Box<dyn FnOnce() -> Result<T, Cause> + Send + 'static>;

/// Strategy of a promise bound to a zero-argument computation that runs at
/// most once.
pub struct Computation<T> {
    started: AtomicBool,
    task: Mutex<Option<Task<T>>>,
}

impl<T> Computation<T> {
    pub(crate) fn new<F, E>(computation: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            started: AtomicBool::new(false),
            task: Mutex::new(Some(Box::new(move || computation().map_err(into_cause)))),
        }
    }

    pub(crate) fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Runs the computation on the calling thread and realizes `core` with
    /// its result.
    ///
    /// A panicking computation realizes `core` with [`ComputationPanicked`]
    /// before the panic resumes, so waiters are released.
    pub(crate) fn execute<'a>(&self, core: &'a Core<T>) -> Result<&'a T, Error> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRun);
        }
        let task = self.task.lock().take().ok_or(Error::AlreadyRun)?;
        if core.is_claimed() {
            // A parent got there first.
            return Err(Error::AlreadyRealized);
        }
        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(value)) => Outcome::Success(value),
            Ok(Err(cause)) => Outcome::Failure(cause),
            Err(payload) => {
                let cause: Cause = Arc::new(ComputationPanicked::new(panic_message(&*payload)));
                // Losing here only means a parent realized the promise meanwhile.
                let _ = core.realize(Outcome::Failure(cause));
                panic::resume_unwind(payload);
            }
        };
        core.realize(outcome)?.as_result()
    }
}

impl<T> fmt::Debug for Computation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("started", &self.has_started())
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Strategy<T> for Computation<T> {}

/// A promise wrapping a computation. [`run`] executes it on the calling
/// thread; [`into_task`] packages that call for an external task runner.
///
/// # Examples
///
/// ```
/// use pledge::{CallablePromise, Promise};
/// use std::thread;
///
/// let promise = CallablePromise::new(|| "42".parse::<u32>());
/// let runner = thread::spawn(promise.clone().into_task());
/// assert_eq!(*promise.get().unwrap(), 42);
/// runner.join().expect("The runner thread has panicked");
/// ```
///
/// [`run`]: Realizable::run
/// [`into_task`]: Realizable::into_task
pub type CallablePromise<T> = Realizable<T, Computation<T>>;

impl<T> Realizable<T, Computation<T>>
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
        Self::from_parts(options, Computation::new(computation))
    }

    /// Runs the computation on this thread, realizes the promise with the
    /// result, and hands the result back.
    ///
    /// A failing computation realizes the promise with its fault and returns
    /// [`Error::Failed`] carrying that same fault. Only the first call runs
    /// anything: later calls fail with [`Error::AlreadyRun`]. If the promise
    /// follows a parent that realized it first, the computation is skipped
    /// and this fails with [`Error::AlreadyRealized`].
    ///
    /// # Panics
    ///
    /// A panic in the computation realizes the promise with a
    /// [`ComputationPanicked`](crate::ComputationPanicked) failure, then
    /// resumes unwinding through this call.
    pub fn run(&self) -> Result<&T, Error> {
        self.strategy().execute(self.core())
    }

    /// Whether [`run`](Realizable::run) has been called.
    pub fn has_started(&self) -> bool {
        self.strategy().has_started()
    }

    /// Packages [`run`](Realizable::run) as a unit of work for a task
    /// runner. The outcome is observed through the promise.
    pub fn into_task(self) -> Box<dyn FnOnce() + Send + 'static> {
        Box::new(move || {
            if let Err(error) = self.run() {
                tracing::trace!(
                    label = self.label().unwrap_or_default(),
                    %error,
                    "scheduled computation did not succeed"
                );
            }
        })
    }
}
