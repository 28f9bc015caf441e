//! Ordered registry of named test procedures

use crate::error::DirectorError;
use crate::panic;
use crate::thrown::Thrown;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::collections::HashSet;
use std::future::Future;

/// What a test procedure returns
pub type TestResult = Result<(), Thrown>;

type SyncProcedure = Box<dyn Fn() -> TestResult>;
type AsyncProcedure = Box<dyn Fn() -> LocalBoxFuture<'static, TestResult>>;

/// A zero-argument unit of test logic
pub(crate) enum Procedure {
    Sync(SyncProcedure),
    Async(AsyncProcedure),
}

impl Procedure {
    /// Run to completion; panics become failures
    pub(crate) async fn invoke(&self) -> TestResult {
        match self {
            Procedure::Sync(test) => panic::call(test)?,
            Procedure::Async(test) => panic::settle(panic::call(test)?).await,
        }
    }
}

pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) procedure: Procedure,
}

/// Tests keyed by unique name, in insertion order
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a synchronous test
    pub fn add<F>(&mut self, name: impl Into<String>, test: F) -> Result<(), DirectorError>
    where
        F: Fn() -> TestResult + 'static,
    {
        self.insert(name.into(), Procedure::Sync(Box::new(test)))
    }

    /// Add a test that returns a future; the run waits for it to settle
    pub fn add_async<F, Fut>(&mut self, name: impl Into<String>, test: F) -> Result<(), DirectorError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        let procedure: AsyncProcedure = Box::new(move || test().boxed_local());
        self.insert(name.into(), Procedure::Async(procedure))
    }

    fn insert(&mut self, name: String, procedure: Procedure) -> Result<(), DirectorError> {
        if self.names.contains(&name) {
            return Err(DirectorError::InvalidArgument(format!(
                "A test called `{}` has already been added.",
                name
            )));
        }

        tracing::debug!(test = %name, position = self.entries.len(), "registered test");
        self.names.insert(name.clone());
        self.entries.push(Entry { name, procedure });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Test names in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}
