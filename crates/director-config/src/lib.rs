//! test-director configuration
//!
//! Resolves the settings a test run is rendered with:
//! - Global user configuration (~/.test-director/config.toml)
//! - Project configuration (director.toml, found by walking up from a directory)
//! - Environment variables (NO_COLOR, FORCE_COLOR, TEST_DIRECTOR_*)
//! - CLI flags (applied by the caller)
//!
//! Later sources override earlier ones.
//!
//! # Example
//!
//! ```no_run
//! use director_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("indent: {}", config.indent);
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{ConfigLoader, DirectorConfig};
pub use settings::{ColorChoice, FileConfig, OutputSection, TraceSection};
