//! Test director - register tests, run them in order, report the results

use crate::console::{set_color_choice, Console};
use crate::diagnostic::Diagnostic;
use crate::error::DirectorError;
use crate::exit::{FailureSink, ProcessExitCode};
use crate::registry::{Registry, TestResult};
use crate::stack::StackCleaner;
use colored::Colorize;
use director_config::DirectorConfig;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Counts for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub total: usize,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} tests passed.", self.passed, self.total)
    }
}

/// How a single test settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(Diagnostic),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Sequential test runner
///
/// ```
/// use test_director::{Failure, TestDirector};
///
/// # futures_util::FutureExt::now_or_never(async {
/// let mut tests = TestDirector::new();
/// tests.add("adds", || {
///     if 1 + 1 != 2 {
///         return Err(Failure::new("math is broken").into());
///     }
///     Ok(())
/// })?;
/// let summary = tests.run(false).await?;
/// assert!(summary.all_passed());
/// # Ok::<(), test_director::DirectorError>(())
/// # }).unwrap().unwrap();
/// ```
pub struct TestDirector {
    tests: Registry,
    console: Console,
    failure_sink: Rc<dyn FailureSink>,
    cleaner: StackCleaner,
}

impl Default for TestDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDirector {
    /// Director writing to the process streams and signalling the process exit code
    pub fn new() -> Self {
        Self {
            tests: Registry::new(),
            console: Console::stdio(),
            failure_sink: Rc::new(ProcessExitCode),
            cleaner: StackCleaner::new(),
        }
    }

    /// Director set up from resolved configuration
    ///
    /// Applies the color choice process-wide and the indent width to this
    /// thread's shared console.
    pub fn configured(config: &DirectorConfig) -> Self {
        set_color_choice(config.color);
        let director = Self::new().with_stack_cleaner(StackCleaner::from_config(config));
        director.console.set_indent(config.indent);
        director
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_failure_sink(mut self, sink: impl FailureSink + 'static) -> Self {
        self.failure_sink = Rc::new(sink);
        self
    }

    pub fn with_stack_cleaner(mut self, cleaner: StackCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Registered tests
    pub fn tests(&self) -> &Registry {
        &self.tests
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Add a synchronous test
    pub fn add<F>(&mut self, name: impl Into<String>, test: F) -> Result<(), DirectorError>
    where
        F: Fn() -> TestResult + 'static,
    {
        self.tests.add(name, test)
    }

    /// Add a test whose future is awaited before the next test starts
    pub fn add_async<F, Fut>(&mut self, name: impl Into<String>, test: F) -> Result<(), DirectorError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.tests.add_async(name, test)
    }

    /// Run every test in insertion order and report the results
    ///
    /// With `throw_on_failure`, a run with failing tests returns
    /// [`DirectorError::SummaryFailure`] instead of printing the summary and
    /// signalling the failure sink; nested directors use this to fail the
    /// enclosing test.
    pub async fn run(&self, throw_on_failure: bool) -> Result<Summary, DirectorError> {
        let mut passed = 0;

        for entry in self.tests.entries() {
            let _group = self
                .console
                .group(&format!("\nTest: {}", entry.name.bold()));

            let outcome = match entry.procedure.invoke().await {
                Ok(()) => Outcome::Passed,
                Err(thrown) => Outcome::Failed(Diagnostic::from_thrown(&thrown, &self.cleaner)),
            };
            tracing::debug!(test = %entry.name, passed = outcome.is_pass(), "test settled");

            match outcome {
                Outcome::Passed => passed += 1,
                Outcome::Failed(diagnostic) => diagnostic.report(&self.console),
            }
        }

        let summary = Summary {
            passed,
            total: self.tests.len(),
        };
        tracing::info!(passed = summary.passed, total = summary.total, "test run finished");

        if summary.all_passed() {
            self.console
                .info(&format!("\n{}\n", summary.to_string().bold().green()));
        } else if throw_on_failure {
            return Err(DirectorError::SummaryFailure {
                message: summary.to_string().bold().red().to_string(),
                summary,
            });
        } else {
            self.console
                .error(&format!("\n{}\n", summary.to_string().bold().red()));
            self.failure_sink.signal_failure();
        }

        Ok(summary)
    }
}
