//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.packet-counter.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".packet-counter.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Response serialization settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Invocation host settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// How a response without replies is written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EmptyReplies {
    /// `"Replies": []`
    #[default]
    Array,
    /// No `Replies` field at all.
    Omit,
    /// `"Replies": null`
    Null,
}

/// Response serialization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON responses.
    #[serde(default)]
    pub pretty: bool,

    /// Serialization of an empty reply list.
    #[serde(default)]
    pub empty_replies: EmptyReplies,
}

/// How input is split into invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// The whole input is one invocation.
    #[default]
    Single,
    /// Each non-blank input line is one invocation.
    Stream,
}

/// Invocation host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Keep processing a stream after a failed invocation.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::default(),
            continue_on_error: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load the default configuration file from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        if args.pretty {
            self.output.pretty = true;
        }
        if let Some(empty_replies) = args.empty_replies {
            self.output.empty_replies = empty_replies;
        }

        if args.stream {
            self.runtime.mode = RuntimeMode::Stream;
        }
        if args.fail_fast {
            self.runtime.continue_on_error = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.verbose);
        assert!(!config.output.pretty);
        assert_eq!(config.output.empty_replies, EmptyReplies::Array);
        assert_eq!(config.runtime.mode, RuntimeMode::Single);
        assert!(config.runtime.continue_on_error);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[output]
pretty = true
empty_replies = "omit"

[runtime]
mode = "stream"
continue_on_error = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert!(config.output.pretty);
        assert_eq!(config.output.empty_replies, EmptyReplies::Omit);
        assert_eq!(config.runtime.mode, RuntimeMode::Stream);
        assert!(!config.runtime.continue_on_error);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[runtime]\nmode = \"stream\"\n").unwrap();
        assert_eq!(config.runtime.mode, RuntimeMode::Stream);
        assert!(config.runtime.continue_on_error);
        assert_eq!(config.output.empty_replies, EmptyReplies::Array);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[runtime]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.runtime.mode, RuntimeMode::Single);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[output]\nempty_replies = \"null\"\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.output.empty_replies, EmptyReplies::Null);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[runtime\nmode = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.stream = true;
        args.pretty = true;
        args.fail_fast = true;
        args.empty_replies = Some(EmptyReplies::Null);

        config.merge_with_args(&args);
        assert_eq!(config.runtime.mode, RuntimeMode::Stream);
        assert!(!config.runtime.continue_on_error);
        assert!(config.output.pretty);
        assert_eq!(config.output.empty_replies, EmptyReplies::Null);
    }

    #[test]
    fn test_merge_keeps_file_values_without_flags() {
        let mut config: Config = toml::from_str("[output]\nempty_replies = \"omit\"\n").unwrap();
        config.merge_with_args(&make_args());
        assert_eq!(config.output.empty_replies, EmptyReplies::Omit);
    }
}
