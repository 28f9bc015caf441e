//! Configuration Loader
//!
//! Loads configuration from multiple sources and resolves it into the flat
//! [`DirectorConfig`] the runner consumes.

use crate::settings::{ColorChoice, FileConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "director.toml";

/// Default spaces per report group level
pub const DEFAULT_INDENT: usize = 2;

/// Resolved settings for a test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorConfig {
    /// Color mode for console output
    pub color: ColorChoice,

    /// Spaces per report group level
    pub indent: usize,

    /// Print cleaned traces under failure messages
    pub trace_enabled: bool,

    /// Rewrite absolute frame paths relative to the working directory
    pub relative_paths: bool,

    /// Extra crates whose frames are dropped from traces
    pub ignored_crates: Vec<String>,

    /// Directory where director.toml was found
    pub project_root: Option<PathBuf>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            indent: DEFAULT_INDENT,
            trace_enabled: true,
            relative_paths: true,
            ignored_crates: Vec::new(),
            project_root: None,
        }
    }
}

impl DirectorConfig {
    /// Resolve a merged file config on top of the defaults
    pub fn from_file_config(file: &FileConfig, project_root: Option<PathBuf>) -> Self {
        let mut config = Self {
            project_root,
            ..Self::default()
        };

        if let Some(output) = &file.output {
            if let Some(color) = output.color {
                config.color = color;
            }
            if let Some(indent) = output.indent {
                config.indent = indent;
            }
        }

        if let Some(trace) = &file.trace {
            if let Some(enabled) = trace.enabled {
                config.trace_enabled = enabled;
            }
            if let Some(relative) = trace.relative_paths {
                config.relative_paths = relative;
            }
            config.ignored_crates = trace.ignored_crates.clone();
        }

        config
    }

    /// Check if a director.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Configuration loader
///
/// Precedence, lowest to highest:
/// 1. Global config (~/.test-director/config.toml)
/// 2. Project config (director.toml)
/// 3. Environment variables
/// 4. CLI flags (handled by caller)
pub struct ConfigLoader {
    /// Global config path; resolved from the home directory when unset
    global_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Read the global config from `path` instead of the home directory
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find director.toml and merges it over
    /// the global config, then applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<DirectorConfig> {
        let (project_root, project) = find_project_config(start_dir)?;

        let mut file = self.load_global_config()?;
        file.merge(&project);

        let mut config = DirectorConfig::from_file_config(&file, project_root);
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<DirectorConfig> {
        let project = FileConfig::load_from_file(config_path)?;

        let mut file = self.load_global_config()?;
        file.merge(&project);

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        let mut config = DirectorConfig::from_file_config(&file, project_root);
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Load the global config; a missing file or home directory means none
    fn load_global_config(&mut self) -> ConfigResult<FileConfig> {
        if self.global_config_path.is_none() {
            match global_config_path() {
                Ok(path) => self.global_config_path = Some(path),
                Err(ConfigError::HomeNotFound) => return Ok(FileConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            Some(path) if path.exists() => FileConfig::load_from_file(path),
            _ => Ok(FileConfig::default()),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the global config file path (~/.test-director/config.toml)
pub fn global_config_path() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(home.join(".test-director").join("config.toml"))
}

/// Find director.toml by walking up the directory tree
fn find_project_config(start_dir: &Path) -> ConfigResult<(Option<PathBuf>, FileConfig)> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(PROJECT_CONFIG_FILE);

        if config_path.exists() {
            let config = FileConfig::load_from_file(&config_path)?;
            return Ok((Some(current), config));
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Ok((None, FileConfig::default())),
        }
    }
}

/// Apply environment variable overrides
///
/// - `TEST_DIRECTOR_COLOR=auto|always|never` wins over the other color variables
/// - `FORCE_COLOR` (anything but empty or `0`) forces styling
/// - `NO_COLOR` (non-empty) disables styling
/// - `TEST_DIRECTOR_TRACE` toggles traces
fn apply_env_overrides(config: &mut DirectorConfig) -> ConfigResult<()> {
    if let Ok(color) = env::var("TEST_DIRECTOR_COLOR") {
        config.color = color.parse()?;
    } else if env::var("FORCE_COLOR").is_ok_and(|v| !v.is_empty() && v != "0") {
        config.color = ColorChoice::Always;
    } else if env::var("NO_COLOR").is_ok_and(|v| !v.is_empty()) {
        config.color = ColorChoice::Never;
    }

    if let Ok(trace) = env::var("TEST_DIRECTOR_TRACE") {
        config.trace_enabled = parse_bool("TEST_DIRECTOR_TRACE", &trace)?;
    }

    Ok(())
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_global_config_path(dir.path().join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[output]\nindent = 4\n");

        let config = isolated_loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.indent, 4);
        assert!(config.is_project());
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[trace]\nenabled = false\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = isolated_loader(&temp_dir)
            .load_from_directory(&sub_dir)
            .unwrap();

        assert!(!config.trace_enabled);
        assert_eq!(config.project_root.as_deref(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_env_trace_override() {
        let temp_dir = TempDir::new().unwrap();
        env::set_var("TEST_DIRECTOR_TRACE", "no");

        let config = isolated_loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        env::remove_var("TEST_DIRECTOR_TRACE");
        assert!(!config.trace_enabled);
    }

    #[test]
    #[serial]
    fn test_env_trace_invalid() {
        let temp_dir = TempDir::new().unwrap();
        env::set_var("TEST_DIRECTOR_TRACE", "maybe");

        let result = isolated_loader(&temp_dir).load_from_directory(temp_dir.path());

        env::remove_var("TEST_DIRECTOR_TRACE");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("x", "YES").unwrap());
        assert!(!parse_bool("x", "0").unwrap());
        assert!(parse_bool("x", "").is_err());
    }
}
