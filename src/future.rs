//! Awaiting a promise from async code.
use crate::realizable::{Realizable, Strategy};
use crate::Error;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Resolves to the promise's value, or [`Error::Failed`], once it is
/// realized. Created by [`Realizable::realized`].
///
/// Pending polls park the task's waker on the promise; realization wakes
/// every parked task. For a lazy promise the first poll runs the computation
/// inline, on the executor thread.
///
/// # Examples
///
/// ```
/// use pledge::DeliverablePromise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = DeliverablePromise::<&str>::new();
/// let consumer = promise.clone();
/// let task = thread::spawn(move || block_on(async {
///     assert_eq!(*consumer.realized().await.unwrap(), "🍓");
/// }));
/// promise.deliver("🍓").unwrap();
/// task.join().expect("The consumer thread has panicked");
/// ```
#[must_use = "futures do nothing unless polled"]
pub struct Realized<'a, T, S> {
    promise: &'a Realizable<T, S>,
}

impl<'a, T, S> Realized<'a, T, S> {
    pub(crate) fn new(promise: &'a Realizable<T, S>) -> Self {
        Self { promise }
    }
}

impl<'a, T, S> Future for Realized<'a, T, S>
where
    T: Send + Sync + 'static,
    S: Strategy<T>,
{
    type Output = Result<&'a T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let promise = self.promise;
        promise.strategy().prepare(promise.core());
        match promise.core().poll_realized(cx.waker()) {
            Poll::Ready(outcome) => Poll::Ready(outcome.as_result()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{CallablePromise, DeliverablePromise, Error, LazyPromise};
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn resolves_after_delivery_from_another_thread() {
        let promise = DeliverablePromise::<String>::new();
        let producer = promise.clone();
        let task = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            producer.deliver(String::from("🍓")).unwrap();
        });
        let value = block_on(promise.realized()).unwrap();
        assert_eq!(value, "🍓");
        task.join().expect("The producer thread has panicked");
    }

    #[test]
    fn several_tasks_see_the_same_failure() {
        let promise = CallablePromise::<u8>::new(|| Err("reject!!"));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let promise = promise.clone();
                thread::spawn(move || match block_on(promise.realized()) {
                    Err(Error::Failed(cause)) => cause.to_string(),
                    other => panic!("expected a failure, got {other:?}"),
                })
            })
            .collect();
        thread::sleep(std::time::Duration::from_millis(20));
        assert!(promise.run().is_err());
        for waiter in waiters {
            assert_eq!(waiter.join().expect("A waiter thread has panicked"), "reject!!");
        }
    }

    #[test]
    fn lazy_runs_on_first_poll_on_the_polling_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let promise = LazyPromise::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(thread::current().id())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*block_on(promise.realized()).unwrap(), thread::current().id());
        assert_eq!(*block_on(promise.realized()).unwrap(), thread::current().id());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
