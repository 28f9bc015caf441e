//! Failure diagnostics
//!
//! A [`Diagnostic`] is the displayable form of a [`Thrown`] value. Building
//! one is a pure function of the thrown value and the [`StackCleaner`]; it is
//! rendered separately onto a [`Console`].

use crate::console::Console;
use crate::stack::StackCleaner;
use crate::thrown::{carried_trace, AggregateError, AssertionError, Thrown};
use colored::Colorize;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// Normalized view of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Message shown first
    pub message: String,
    /// Cleaned trace, absent when nothing remained after cleaning
    pub trace: Option<String>,
    /// Sub-errors of an aggregate, in order
    pub aggregate: Vec<Diagnostic>,
    /// The error this one was caused by
    pub cause: Option<Box<Diagnostic>>,
}

/// How a failure value is displayed
enum Shape<'a> {
    /// Assertion failure with a generated message: trailing newlines trimmed
    Assertion {
        message: &'a str,
        trace: Option<Cow<'a, str>>,
    },
    /// Any other error: message verbatim, causes and sub-errors followed
    Error {
        error: &'a (dyn Error + 'static),
        trace: Option<Cow<'a, str>>,
    },
    /// Not an error: shown as a debug representation
    Opaque(&'a (dyn fmt::Debug + Send + Sync)),
}

fn classify(thrown: &Thrown) -> Shape<'_> {
    match thrown {
        Thrown::Error { error, trace } => {
            let error: &(dyn Error + 'static) = &**error;
            classify_error(error, trace.as_deref().map(Cow::Borrowed))
        }
        Thrown::Panic {
            message,
            location,
            trace,
        } => Shape::Assertion {
            message,
            trace: match (trace, location) {
                (Some(trace), _) => Some(Cow::Borrowed(trace.as_str())),
                (None, Some(location)) => Some(Cow::Owned(format!("at {}", location))),
                (None, None) => None,
            },
        },
        Thrown::Value(value) => Shape::Opaque(&**value),
    }
}

fn classify_error<'a>(
    error: &'a (dyn Error + 'static),
    trace: Option<Cow<'a, str>>,
) -> Shape<'a> {
    let trace = trace.or_else(|| carried_trace(error).map(Cow::Borrowed));
    match error.downcast_ref::<AssertionError>() {
        Some(assertion) if assertion.generated_message() => Shape::Assertion {
            message: assertion.message(),
            trace,
        },
        _ => Shape::Error { error, trace },
    }
}

impl Diagnostic {
    /// Diagnostic with only a message
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
            aggregate: Vec::new(),
            cause: None,
        }
    }

    /// Build the diagnostic for a thrown value
    pub fn from_thrown(thrown: &Thrown, cleaner: &StackCleaner) -> Self {
        Self::from_shape(classify(thrown), cleaner)
    }

    fn from_shape(shape: Shape<'_>, cleaner: &StackCleaner) -> Self {
        match shape {
            Shape::Assertion { message, trace } => Self {
                message: message.trim_end().to_string(),
                trace: clean(trace, cleaner),
                aggregate: Vec::new(),
                cause: None,
            },
            Shape::Error { error, trace } => {
                let aggregate = error
                    .downcast_ref::<AggregateError>()
                    .map(|aggregate| {
                        aggregate
                            .errors()
                            .iter()
                            .map(|thrown| Self::from_thrown(thrown, cleaner))
                            .collect()
                    })
                    .unwrap_or_default();

                let cause = error.source().map(|source| {
                    Box::new(Self::from_shape(classify_error(source, None), cleaner))
                });

                Self {
                    message: error.to_string(),
                    trace: clean(trace, cleaner),
                    aggregate,
                    cause,
                }
            }
            Shape::Opaque(value) => Self::plain(format!("{:?}", value)),
        }
    }

    /// Write this diagnostic at the console's current depth
    ///
    /// Messages and traces go to stderr; the `Aggregate errors:` and `Cause:`
    /// group labels go to stdout like every other group label.
    pub fn report(&self, console: &Console) {
        console.error(&format!("\n{}", self.message.red()));

        if let Some(trace) = &self.trace {
            console.error(&format!("\n{}", trace.red().dimmed()));
        }

        if !self.aggregate.is_empty() {
            let _group = console.group(&format!("\n{}", "Aggregate errors:".red()));
            for diagnostic in &self.aggregate {
                diagnostic.report(console);
            }
        }

        if let Some(cause) = &self.cause {
            let _group = console.group(&format!("\n{}", "Cause:".red()));
            cause.report(console);
        }
    }
}

fn clean(trace: Option<Cow<'_, str>>, cleaner: &StackCleaner) -> Option<String> {
    let cleaned = cleaner.clean(trace.as_deref()?);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
