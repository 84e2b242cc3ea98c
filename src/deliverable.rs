//! Promises realized by an explicit producer call.
use crate::options::Options;
use crate::outcome::{into_cause, Outcome};
use crate::realizable::{Realizable, Strategy};
use crate::Error;

/// Strategy of a promise whose producer delivers the outcome by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct Manual;

impl<T> Strategy<T> for Manual {}

/// A promise that is delivered once and exactly once, by [`deliver`] or
/// [`fail`]. Used when something outside this crate, a network handler for
/// instance, decides the outcome.
///
/// [`deliver`]: Realizable::deliver
/// [`fail`]: Realizable::fail
pub type DeliverablePromise<T> = Realizable<T, Manual>;

impl<T> Realizable<T, Manual>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self::from_parts(options, Manual)
    }

    /// Realizes the promise with `value`, running success listeners on this
    /// thread before returning.
    ///
    /// Fails with [`Error::AlreadyRealized`] if the promise was already
    /// realized; the first outcome stays.
    pub fn deliver(&self, value: T) -> Result<(), Error> {
        self.core().realize(Outcome::Success(value)).map(drop)
    }

    /// Realizes the promise with a failure. Same contract as
    /// [`deliver`](Realizable::deliver).
    pub fn fail<E>(&self, cause: E) -> Result<(), Error>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.core()
            .realize(Outcome::Failure(into_cause(cause)))
            .map(drop)
    }
}

impl<T> Default for Realizable<T, Manual>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::DeliverablePromise;
    use crate::{Error, Promise};
    use std::time::Duration;

    #[test]
    fn starts_pending() {
        let promise = DeliverablePromise::<u8>::new();
        assert!(!promise.is_realized());
        assert!(matches!(promise.is_success(), Err(Error::NotRealized)));
        assert!(matches!(promise.is_failure(), Err(Error::NotRealized)));
        assert!(promise.outcome().is_none());
    }

    #[test]
    fn deliver_then_read_repeatedly() {
        let promise = DeliverablePromise::new();
        promise.deliver(vec![1, 2, 3]).unwrap();
        assert!(promise.is_realized());
        assert!(promise.is_success().unwrap());
        assert!(!promise.is_failure().unwrap());
        for _ in 0..3 {
            assert_eq!(promise.get().unwrap(), &[1, 2, 3]);
        }
        assert_eq!(promise.get_timeout(Duration::ZERO).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn default_value_is_a_success() {
        let promise = DeliverablePromise::<Option<String>>::default();
        promise.deliver(None).unwrap();
        assert!(promise.is_success().unwrap());
        assert_eq!(promise.get().unwrap(), &None);
    }

    #[test]
    fn second_delivery_is_rejected() {
        let promise = DeliverablePromise::new();
        promise.deliver("first").unwrap();
        assert!(matches!(promise.deliver("second"), Err(Error::AlreadyRealized)));
        assert!(matches!(promise.fail("nope"), Err(Error::AlreadyRealized)));
        assert_eq!(*promise.get().unwrap(), "first");
        assert_eq!(
            promise.deliver("third").unwrap_err().to_string(),
            "promise is already realized"
        );
    }

    #[test]
    fn fail_then_get_reports_cause() {
        let promise = DeliverablePromise::<u8>::new();
        promise.fail("💥").unwrap();
        assert!(promise.is_failure().unwrap());
        let error = promise.get().unwrap_err();
        assert_eq!(error.cause().map(ToString::to_string).as_deref(), Some("💥"));
        assert_eq!(error.to_string(), "promise failed: 💥");
        assert!(matches!(promise.deliver(1), Err(Error::AlreadyRealized)));
    }

    #[test]
    fn get_timeout_on_pending_times_out() {
        let promise = DeliverablePromise::<u8>::new();
        assert!(matches!(
            promise.get_timeout(Duration::from_millis(10)),
            Err(Error::TimedOut)
        ));
        assert!(!promise.wait_timeout(Duration::from_millis(10)).unwrap());
        promise.deliver(5).unwrap();
        assert!(promise.wait_timeout(Duration::from_millis(10)).unwrap());
    }
}
