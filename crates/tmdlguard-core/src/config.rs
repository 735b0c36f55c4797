//! Configuration schema (tmdlguard.toml)

use crate::schema::DEFAULT_COMPATIBILITY_LEVEL;
use serde::{Deserialize, Serialize};

/// Default name of the folder holding definition files
pub const DEFAULT_DEFINITION_DIR: &str = "definition";

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tmdlguard.toml";

/// Lint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    /// Collect non-fatal warnings while lexing
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Subdirectory of the project root that holds definition files
    #[serde(default = "default_definition_dir")]
    pub definition_dir: String,

    /// File extension of definition files, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Directory names skipped during discovery
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Lex and parse files on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Compatibility level reported when no database object declares one
    #[serde(default = "default_compatibility_level")]
    pub default_compatibility_level: u32,

    /// Upper bound accepted for the compatibility level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_compatibility_level: Option<u32>,

    /// Largest definition file that will be read
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Lint settings
    #[serde(default)]
    pub lint: LintConfig,
}

fn default_true() -> bool {
    true
}

fn default_definition_dir() -> String {
    DEFAULT_DEFINITION_DIR.to_string()
}

fn default_extension() -> String {
    "tmdl".to_string()
}

fn default_ignore_dirs() -> Vec<String> {
    vec![".pbi".to_string()]
}

fn default_compatibility_level() -> u32 {
    DEFAULT_COMPATIBILITY_LEVEL
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition_dir: default_definition_dir(),
            extension: default_extension(),
            ignore_dirs: default_ignore_dirs(),
            parallel: true,
            default_compatibility_level: DEFAULT_COMPATIBILITY_LEVEL,
            max_compatibility_level: None,
            max_file_bytes: default_max_file_bytes(),
            lint: LintConfig::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Whether a directory name is skipped during discovery
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|ignored| ignored == name)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.definition_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "definition_dir must not be empty".to_string(),
            ));
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(ConfigError::InvalidValue(format!(
                "extension must be given without a leading dot, got '{}'",
                self.extension
            )));
        }
        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
