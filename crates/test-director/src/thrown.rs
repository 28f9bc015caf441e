//! Failure values produced by test procedures
//!
//! A procedure fails by returning `Err(Thrown)` or by panicking. [`Thrown`]
//! converts from every `std::error::Error`, so `?` works inside procedures.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

/// Boxed error that can cross into a [`Thrown`]
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Whatever a failing test produced
pub enum Thrown {
    /// An error value, with the trace captured where it was converted
    Error {
        error: BoxError,
        trace: Option<String>,
    },
    /// A panic raised while the procedure ran
    Panic {
        message: String,
        location: Option<String>,
        trace: Option<String>,
    },
    /// A value that is not an error at all
    Value(Box<dyn fmt::Debug + Send + Sync>),
}

impl Thrown {
    /// Wrap a boxed error, capturing a trace unless the error carries one
    pub fn from_boxed(error: BoxError) -> Self {
        let trace = if carried_trace(&*error).is_some() {
            None
        } else {
            capture_trace()
        };
        Thrown::Error { error, trace }
    }

    /// Throw a non-error value
    pub fn value<T>(value: T) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Thrown::Value(Box::new(value))
    }

    /// Replace the trace of an error or panic
    pub fn with_trace(self, trace: impl Into<String>) -> Self {
        self.set_trace(Some(trace.into()))
    }

    /// Drop the trace of an error or panic
    pub fn without_trace(self) -> Self {
        self.set_trace(None)
    }

    fn set_trace(self, new: Option<String>) -> Self {
        match self {
            Thrown::Error { error, .. } => Thrown::Error { error, trace: new },
            Thrown::Panic {
                message, location, ..
            } => Thrown::Panic {
                message,
                location,
                trace: new,
            },
            value @ Thrown::Value(_) => value,
        }
    }

    /// The trace attached to this value, if any
    pub fn trace(&self) -> Option<&str> {
        match self {
            Thrown::Error { trace, .. } | Thrown::Panic { trace, .. } => trace.as_deref(),
            Thrown::Value(_) => None,
        }
    }

    /// Build from a caught panic payload
    pub(crate) fn from_panic(
        payload: Box<dyn Any + Send>,
        location: Option<String>,
        trace: Option<String>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Thrown::Panic {
            message,
            location,
            trace,
        }
    }
}

impl<E> From<E> for Thrown
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Thrown::from_boxed(Box::new(error))
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thrown::Error { error, trace } => f
                .debug_struct("Error")
                .field("error", error)
                .field("trace", trace)
                .finish(),
            Thrown::Panic {
                message,
                location,
                trace,
            } => f
                .debug_struct("Panic")
                .field("message", message)
                .field("location", location)
                .field("trace", trace)
                .finish(),
            Thrown::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Render a backtrace when capturing is enabled (RUST_BACKTRACE / RUST_LIB_BACKTRACE)
pub(crate) fn capture_trace() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// Trace stored inside one of this crate's error types
pub(crate) fn carried_trace<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a str> {
    if let Some(failure) = error.downcast_ref::<Failure>() {
        failure.trace()
    } else if let Some(aggregate) = error.downcast_ref::<AggregateError>() {
        aggregate.trace()
    } else {
        None
    }
}

fn as_source(cause: &Option<BoxError>) -> Option<&(dyn Error + 'static)> {
    cause.as_deref().map(|e| e as &(dyn Error + 'static))
}

/// General purpose failure with an optional cause
///
/// ```
/// use test_director::Failure;
///
/// let failure = Failure::new("Message B.").caused_by(Failure::new("Message A."));
/// assert_eq!(failure.to_string(), "Message B.");
/// ```
#[derive(Debug)]
pub struct Failure {
    message: String,
    cause: Option<BoxError>,
    trace: Option<String>,
}

impl Failure {
    /// Create a failure, capturing a trace when enabled
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            trace: capture_trace(),
        }
    }

    /// Attach the error that caused this one
    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Replace the captured trace
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Drop the captured trace
    pub fn without_trace(mut self) -> Self {
        self.trace = None;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        as_source(&self.cause)
    }
}

/// Several failures reported as one
#[derive(Debug)]
pub struct AggregateError {
    message: String,
    errors: Vec<Thrown>,
    cause: Option<BoxError>,
    trace: Option<String>,
}

impl AggregateError {
    pub fn new(message: impl Into<String>, errors: Vec<Thrown>) -> Self {
        Self {
            message: message.into(),
            errors,
            cause: None,
            trace: capture_trace(),
        }
    }

    /// Attach the error that caused this one
    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Drop the captured trace
    pub fn without_trace(mut self) -> Self {
        self.trace = None;
        self
    }

    /// Sub-errors, in the order given
    pub fn errors(&self) -> &[Thrown] {
        &self.errors
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for AggregateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        as_source(&self.cause)
    }
}

/// Assertion failure produced by an assertion helper
///
/// Generated messages end with a newline that is trimmed when reported;
/// messages supplied by the test author are shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionError {
    message: String,
    generated_message: bool,
}

impl AssertionError {
    /// Assertion failure with an author-supplied message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            generated_message: false,
        }
    }

    /// Assertion failure with a library-generated message
    pub fn generated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            generated_message: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn generated_message(&self) -> bool {
        self.generated_message
    }
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for AssertionError {}
