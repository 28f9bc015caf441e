//! Fixed test suites run by the fixture binary

use crate::Suite;
use director_config::DirectorConfig;
use std::time::Duration;
use test_director::{
    console, AggregateError, DirectorError, Failure, Summary, TestDirector, TestResult, Thrown,
};

pub async fn run(suite: Suite, config: &DirectorConfig) -> Result<Summary, DirectorError> {
    let mut tests = TestDirector::configured(config);

    match suite {
        Suite::Passes => passes(&mut tests)?,
        Suite::Fails => fails(&mut tests)?,
        Suite::Nested => nested(&mut tests, config)?,
        Suite::Awaits => awaits(&mut tests)?,
        Suite::Output => output(&mut tests)?,
    }

    tests.run(false).await
}

fn passes(tests: &mut TestDirector) -> Result<(), DirectorError> {
    tests.add("a", || Ok(()))?;
    tests.add("b", || Ok(()))?;
    Ok(())
}

fn fails(tests: &mut TestDirector) -> Result<(), DirectorError> {
    tests.add("a", || Err(Failure::new("Message.").into()))?;
    tests.add("b", || Ok(()))?;
    Ok(())
}

fn nested(tests: &mut TestDirector, config: &DirectorConfig) -> Result<(), DirectorError> {
    let config = config.clone();
    tests.add_async("nested", move || inner_suite(config.clone()))?;
    tests.add("after", || Ok(()))?;
    Ok(())
}

async fn inner_suite(config: DirectorConfig) -> TestResult {
    let mut tests = TestDirector::configured(&config);
    tests.add("inner a", || Ok(()))?;
    tests.add("inner b", || Err(Failure::new("Message.").into()))?;
    tests.run(true).await?;
    Ok(())
}

fn awaits(tests: &mut TestDirector) -> Result<(), DirectorError> {
    tests.add_async("waits", waits)?;
    tests.add("next", || {
        console::info("next");
        Ok(())
    })?;
    Ok(())
}

async fn waits() -> TestResult {
    tokio::time::sleep(Duration::from_millis(50)).await;
    console::info("waited");
    Ok(())
}

fn output(tests: &mut TestDirector) -> Result<(), DirectorError> {
    tests.add("prints", || {
        console::info("line one\nline two");
        console::error("to stderr");
        Ok(())
    })?;
    tests.add("caused", || {
        Err(Failure::new("Message B.")
            .caused_by(Failure::new("Message A."))
            .into())
    })?;
    tests.add("aggregate", || {
        Err(AggregateError::new(
            "Message C.",
            vec![Failure::new("Message A.").into(), Thrown::value("Message B.")],
        )
        .into())
    })?;
    tests.add("panics", || panic!("Message."))?;
    Ok(())
}
