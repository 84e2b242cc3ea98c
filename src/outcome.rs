//! The realized state of a promise.
use crate::Error;
use std::sync::Arc;

/// Why a promise failed.
///
/// Shared, so the fault handed back to [`run`](crate::Realizable::run)'s
/// caller is the very same one stored in the promise.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Turns anything that converts into a boxed error (errors, `&str`,
/// `String`) into a [`Cause`].
pub(crate) fn into_cause<E>(error: E) -> Cause
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    Arc::from(error.into())
}

/// A realized promise either holds a value or a failure cause.
///
/// The tag is explicit: a `Success` carrying an empty or default value is
/// still a success.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Success(T),
    Failure(Cause),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Cause> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(cause) => Some(cause),
        }
    }

    /// The value, or [`Error::Failed`] wrapping the cause.
    pub fn as_result(&self) -> Result<&T, Error> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(cause) => Err(Error::Failed(cause.clone())),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Failure(_) => "failure",
        }
    }
}

/// The cause a chained promise fails with when its parent fails.
#[derive(Debug, thiserror::Error)]
#[error("upstream promise failed: {0}")]
pub struct UpstreamFailure(#[source] Cause);

impl UpstreamFailure {
    pub fn new(cause: Cause) -> Self {
        Self(cause)
    }

    /// The parent's own failure cause.
    pub fn upstream(&self) -> &Cause {
        &self.0
    }
}

/// The cause a promise fails with when its computation panicked.
#[derive(Debug, thiserror::Error)]
#[error("computation panicked: {message}")]
pub struct ComputationPanicked {
    message: String,
}

impl ComputationPanicked {
    pub(crate) fn new(message: String) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::{into_cause, Outcome, UpstreamFailure};
    use crate::Error;
    use std::error::Error as _;
    use std::sync::Arc;

    #[test]
    fn empty_success_is_still_success() {
        let outcome: Outcome<Option<()>> = Outcome::Success(None);
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.as_result().unwrap(), &None);

        let outcome = Outcome::Success(String::new());
        assert_eq!(outcome.success().map(String::as_str), Some(""));
        assert!(outcome.failure().is_none());
    }

    #[test]
    fn failure_shares_its_cause() {
        let cause = into_cause("disk on fire");
        let outcome: Outcome<u8> = Outcome::Failure(cause.clone());
        match outcome.as_result() {
            Err(Error::Failed(failed)) => assert!(Arc::ptr_eq(&failed, &cause)),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(cause.to_string(), "disk on fire");
    }

    #[test]
    fn upstream_failure_chains_its_source() {
        let cause = into_cause(String::from("timeout"));
        let upstream = UpstreamFailure::new(cause.clone());
        assert!(Arc::ptr_eq(upstream.upstream(), &cause));
        assert_eq!(upstream.to_string(), "upstream promise failed: timeout");
        assert_eq!(upstream.source().map(|source| source.to_string()).as_deref(), Some("timeout"));
    }
}
