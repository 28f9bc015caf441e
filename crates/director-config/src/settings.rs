//! Configuration file schema (director.toml and the global config.toml)
//!
//! Every field is optional so a partial file can be merged over another one.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Largest accepted indentation width per report group.
pub const MAX_INDENT: usize = 8;

/// When to emit ANSI styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Always style output
    Always,
    /// Never style output
    Never,
    /// Style output when the terminal supports it
    #[default]
    Auto,
}

impl FromStr for ColorChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            "auto" => Ok(ColorChoice::Auto),
            other => Err(ConfigError::InvalidValue {
                field: "output.color".to_string(),
                reason: format!("must be 'auto', 'always', or 'never', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorChoice::Always => "always",
            ColorChoice::Never => "never",
            ColorChoice::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// Contents of one configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Console output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSection>,

    /// Failure trace settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceSection>,
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Color mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorChoice>,

    /// Spaces per report group level (default: 2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<usize>,
}

/// `[trace]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TraceSection {
    /// Print cleaned traces under failure messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Rewrite absolute frame paths relative to the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_paths: Option<bool>,

    /// Extra crates whose frames are dropped from traces
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_crates: Vec<String>,
}

impl FileConfig {
    /// Load a configuration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(indent) = self.output.as_ref().and_then(|o| o.indent) {
            if indent > MAX_INDENT {
                return Err(ConfigError::InvalidValue {
                    field: "output.indent".to_string(),
                    reason: format!("must be at most {}, got {}", MAX_INDENT, indent),
                });
            }
        }

        if let Some(trace) = &self.trace {
            for name in &trace.ignored_crates {
                if !is_valid_crate_name(name) {
                    return Err(ConfigError::InvalidValue {
                        field: "trace.ignored_crates".to_string(),
                        reason: format!("'{}' is not a crate name", name),
                    });
                }
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values set in `other` win; ignored crate lists are concatenated.
    pub fn merge(&mut self, other: &FileConfig) {
        if let Some(theirs) = &other.output {
            let ours = self.output.get_or_insert_with(Default::default);
            if theirs.color.is_some() {
                ours.color = theirs.color;
            }
            if theirs.indent.is_some() {
                ours.indent = theirs.indent;
            }
        }

        if let Some(theirs) = &other.trace {
            let ours = self.trace.get_or_insert_with(Default::default);
            if theirs.enabled.is_some() {
                ours.enabled = theirs.enabled;
            }
            if theirs.relative_paths.is_some() {
                ours.relative_paths = theirs.relative_paths;
            }
            for name in &theirs.ignored_crates {
                if !ours.ignored_crates.contains(name) {
                    ours.ignored_crates.push(name.clone());
                }
            }
        }
    }
}

/// Crate names as they appear in symbol paths: identifier characters only.
fn is_valid_crate_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[output]
color = "never"
indent = 4

[trace]
enabled = false
relative_paths = false
ignored_crates = ["my_harness"]
"#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        let output = config.output.unwrap();
        assert_eq!(output.color, Some(ColorChoice::Never));
        assert_eq!(output.indent, Some(4));

        let trace = config.trace.unwrap();
        assert_eq!(trace.enabled, Some(false));
        assert_eq!(trace.relative_paths, Some(false));
        assert_eq!(trace.ignored_crates, vec!["my_harness".to_string()]);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[output]\ncolour = \"never\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_indent_out_of_range() {
        let config: FileConfig = toml::from_str("[output]\nindent = 12\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.indent"));
    }

    #[rstest]
    #[case("my_harness", true)]
    #[case("_private", true)]
    #[case("tokio2", true)]
    #[case("2fast", false)]
    #[case("has-dash", false)]
    #[case("", false)]
    fn test_crate_name_validation(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_crate_name(name), valid);
    }

    #[rstest]
    #[case("always", ColorChoice::Always)]
    #[case("NEVER", ColorChoice::Never)]
    #[case("Auto", ColorChoice::Auto)]
    fn test_color_choice_from_str(#[case] input: &str, #[case] expected: ColorChoice) {
        assert_eq!(input.parse::<ColorChoice>().unwrap(), expected);
    }

    #[test]
    fn test_color_choice_rejects_unknown() {
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut base: FileConfig = toml::from_str(
            r#"
[output]
color = "always"
indent = 4

[trace]
ignored_crates = ["a"]
"#,
        )
        .unwrap();
        let other: FileConfig = toml::from_str(
            r#"
[output]
color = "never"

[trace]
enabled = false
ignored_crates = ["a", "b"]
"#,
        )
        .unwrap();

        base.merge(&other);

        let output = base.output.unwrap();
        assert_eq!(output.color, Some(ColorChoice::Never));
        assert_eq!(output.indent, Some(4));

        let trace = base.trace.unwrap();
        assert_eq!(trace.enabled, Some(false));
        assert_eq!(trace.ignored_crates, vec!["a".to_string(), "b".to_string()]);
    }
}
