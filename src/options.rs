//! Per-promise configuration.
use crate::listener::{FaultSink, TracingSink};
use crate::{CallablePromise, DeliverablePromise, LazyPromise};
use std::fmt;
use std::sync::Arc;

/// Settings shared by every kind of promise.
#[derive(Clone)]
pub struct Options {
    label: Option<Arc<str>>,
    fault_sink: Arc<dyn FaultSink>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            label: None,
            fault_sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Names the promise in log output and in reported listener faults.
    pub fn with_label<L: Into<Arc<str>>>(self, label: L) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    pub fn with_fault_sink(self, fault_sink: Arc<dyn FaultSink>) -> Self {
        Self { fault_sink, ..self }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn fault_sink(&self) -> &dyn FaultSink {
        &*self.fault_sink
    }
}

/// Configures and constructs a promise.
///
/// # Examples
///
/// ```
/// use pledge::{Builder, Promise};
///
/// let promise = Builder::new().label("answer").callable(|| Ok::<_, String>(42));
/// assert_eq!(promise.label(), Some("answer"));
/// assert_eq!(*promise.run().unwrap(), 42);
/// assert!(promise.is_success().unwrap());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Builder {
    options: Options,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label<L: Into<Arc<str>>>(self, label: L) -> Self {
        Self {
            options: self.options.with_label(label),
        }
    }

    /// Sends listener faults to `fault_sink` instead of logging them.
    pub fn fault_sink<F: FaultSink>(self, fault_sink: F) -> Self {
        Self {
            options: self.options.with_fault_sink(Arc::new(fault_sink)),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn deliverable<T>(self) -> DeliverablePromise<T>
    where
        T: Send + Sync + 'static,
    {
        DeliverablePromise::with_options(self.options)
    }

    pub fn callable<T, F, E>(self, computation: F) -> CallablePromise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        CallablePromise::with_options(self.options, computation)
    }

    pub fn lazy<T, F, E>(self, computation: F) -> LazyPromise<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        LazyPromise::with_options(self.options, computation)
    }
}
