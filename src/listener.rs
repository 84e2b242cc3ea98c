//! Listener callbacks and where their faults go.
use crate::options::Options;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub(crate) type SuccessListener<T> = Box<dyn FnOnce(&T) + Send + 'static>;
pub(crate) type FailureListener = Box<dyn FnOnce(&crate::Cause) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Success,
    Failure,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerKind::Success => f.write_str("success"),
            ListenerKind::Failure => f.write_str("failure"),
        }
    }
}

/// A listener panicked while being dispatched.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} listener panicked: {message}")]
pub struct ListenerFault {
    kind: ListenerKind,
    label: Option<String>,
    message: String,
}

impl ListenerFault {
    fn from_panic(kind: ListenerKind, label: Option<&str>, payload: Box<dyn Any + Send>) -> Self {
        Self {
            kind,
            label: label.map(str::to_owned),
            message: panic_message(&*payload),
        }
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Label of the promise whose listener panicked.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receives faults raised by listeners.
///
/// Reports run on the realizing thread and must not panic.
pub trait FaultSink: Send + Sync + 'static {
    fn report(&self, fault: ListenerFault);
}

impl<S: FaultSink + ?Sized> FaultSink for Arc<S> {
    fn report(&self, fault: ListenerFault) {
        (**self).report(fault);
    }
}

/// Logs listener faults through `tracing`. Used unless a promise is built
/// with another sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FaultSink for TracingSink {
    fn report(&self, fault: ListenerFault) {
        tracing::error!(
            label = fault.label().unwrap_or_default(),
            kind = %fault.kind(),
            "promise listener panicked: {}",
            fault.message()
        );
    }
}

/// The message a panic was raised with, if it carried one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

/// Runs one listener, catching a panic and handing it to the fault sink.
pub(crate) fn invoke<A>(
    listener: Box<dyn FnOnce(&A) + Send + 'static>,
    arg: &A,
    kind: ListenerKind,
    options: &Options,
) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(arg))) {
        options
            .fault_sink()
            .report(ListenerFault::from_panic(kind, options.label(), payload));
    }
}
