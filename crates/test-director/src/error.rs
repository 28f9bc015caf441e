//! Errors surfaced to the caller of a test director

use crate::director::Summary;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectorError {
    /// Registration misuse, e.g. a duplicate test name
    #[error("{0}")]
    InvalidArgument(String),

    /// Some tests failed and the run was asked to raise; the message is the
    /// styled summary line
    #[error("{message}")]
    SummaryFailure { message: String, summary: Summary },
}
