//! Failure signal
//!
//! A run that fails without raising marks the process as failed instead of
//! exiting; `main` reads the mark through [`exit_code`].

use std::cell::Cell;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

static PROCESS_FAILED: AtomicBool = AtomicBool::new(false);

/// Receives the signal that a run had failing tests
pub trait FailureSink {
    fn signal_failure(&self);
}

/// Marks the whole process as failed
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExitCode;

impl FailureSink for ProcessExitCode {
    fn signal_failure(&self) {
        PROCESS_FAILED.store(true, Ordering::SeqCst);
    }
}

/// Whether any run signalled [`ProcessExitCode`]
pub fn has_failed() -> bool {
    PROCESS_FAILED.load(Ordering::SeqCst)
}

/// Exit code for `main`: failure once any run signalled [`ProcessExitCode`]
///
/// ```no_run
/// use std::process::ExitCode;
///
/// fn main() -> ExitCode {
///     // ... run tests ...
///     test_director::exit_code()
/// }
/// ```
pub fn exit_code() -> ExitCode {
    if has_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// In-memory failure signal, shared between clones
#[derive(Debug, Default, Clone)]
pub struct FailureFlag(Rc<Cell<bool>>);

impl FailureFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

impl FailureSink for FailureFlag {
    fn signal_failure(&self) {
        self.0.set(true);
    }
}
