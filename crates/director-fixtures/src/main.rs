use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use director_config::{ColorChoice, ConfigLoader, DirectorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod suites;

/// Fixture suites for test-director
///
/// Each subcommand runs a fixed suite of tests and exits with status 1 when
/// any of them failed.
///
/// ENVIRONMENT VARIABLES:
///     TEST_DIRECTOR_LOG    Log filter (default: warn)
///     TEST_DIRECTOR_COLOR  auto, always or never
///     TEST_DIRECTOR_TRACE  Set to 0 to hide traces
///     NO_COLOR             Set to disable colored output
#[derive(Parser)]
#[command(name = "director-fixture")]
#[command(version)]
struct Cli {
    /// Color mode, overriding configuration and environment
    #[arg(long, global = true, value_name = "WHEN")]
    color: Option<ColorChoice>,

    /// Project config file to use instead of searching for director.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    suite: Suite,
}

#[derive(Subcommand, Clone, Copy)]
enum Suite {
    /// Two passing tests
    Passes,
    /// One failing and one passing test
    Fails,
    /// A test that runs a nested director with a failing test
    Nested,
    /// An asynchronous test that sleeps before a synchronous one
    Awaits,
    /// Tests that print through the shared console, and failures with causes
    Output,
}

fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start the async runtime")?;

    let summary = runtime.block_on(suites::run(cli.suite, &config))?;
    tracing::debug!(%summary, "fixture suite finished");

    Ok(test_director::exit_code())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TEST_DIRECTOR_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<DirectorConfig> {
    let mut loader = ConfigLoader::new();
    let mut config = match &cli.config {
        Some(path) => loader.load_from_file(path)?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            loader.load_from_directory(&cwd)?
        }
    };

    if let Some(color) = cli.color {
        config.color = color;
    }
    Ok(config)
}
