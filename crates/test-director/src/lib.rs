//! test-director - an ultra lightweight sequential test runner
//!
//! Tests are named procedures registered on a [`TestDirector`]. Running the
//! director executes them one at a time in registration order, waiting for
//! asynchronous tests to settle, and reports each failure with a cleaned-up
//! diagnostic under the test's header. The run ends with a summary such as
//! `2/3 tests passed.`; failures either mark the process as failed (see
//! [`exit_code`]) or are returned as [`DirectorError::SummaryFailure`] so an
//! enclosing test can fail with them.
//!
//! # Example
//!
//! ```no_run
//! use std::process::ExitCode;
//! use std::time::Duration;
//! use test_director::{Failure, TestDirector, TestResult};
//!
//! async fn waits() -> TestResult {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     Ok(())
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ExitCode {
//!     let mut tests = TestDirector::new();
//!
//!     tests
//!         .add("checks", || {
//!             assert_eq!(1 + 1, 2);
//!             Ok(())
//!         })
//!         .unwrap();
//!     tests.add_async("waits", waits).unwrap();
//!     tests
//!         .add("fails", || Err(Failure::new("Message.").into()))
//!         .unwrap();
//!
//!     tests.run(false).await.unwrap();
//!     test_director::exit_code()
//! }
//! ```

pub mod console;
pub mod diagnostic;
pub mod director;
pub mod error;
pub mod exit;
mod panic;
pub mod registry;
pub mod stack;
pub mod thrown;

pub use console::{Captured, Console};
pub use diagnostic::Diagnostic;
pub use director::{Outcome, Summary, TestDirector};
pub use error::DirectorError;
pub use exit::{exit_code, has_failed, FailureFlag, FailureSink, ProcessExitCode};
pub use registry::{Registry, TestResult};
pub use stack::StackCleaner;
pub use thrown::{AggregateError, AssertionError, BoxError, Failure, Thrown};
