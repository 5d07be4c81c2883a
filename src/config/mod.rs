//! Configuration System for aiql
//!
//! Provides a configuration system supporting:
//! - TOML configuration files
//! - Environment variable overrides
//! - Reasoning profiles (default, shallow, deep, custom)
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./aiql.toml` - Project-local configuration
//! 2. `~/.config/aiql/config.toml` - User configuration (XDG)
//! 3. `~/.aiql/config.toml` - User configuration (legacy)
//! 4. `/etc/aiql/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `AIQL_PROFILE` - Reasoning profile (default, shallow, deep)
//! - `AIQL_MAX_STEPS` - Maximum forward-chaining rounds
//! - `AIQL_MAX_DEPTH` - Backward-chaining depth cap
//! - `AIQL_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `AIQL_FORMAT` - Output format (text, json)
//! - `AIQL_MAX_INPUT_BYTES` - Lexer input size cap
//!
//! # Example Configuration
//!
//! ```toml
//! # aiql.toml
//!
//! [general]
//! format = "text"
//! log_level = "normal"
//!
//! [lexer]
//! max_input_bytes = 10485760
//! preserve_comments = false
//!
//! [reasoning]
//! profile = "default"
//! max_steps = 100
//! max_depth = 20
//! conjunction_cap = 10
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lexer::{LexerOptions, DEFAULT_MAX_INPUT_BYTES};
use crate::reasoning::EngineConfig;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AiqlConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Lexer settings
    pub lexer: LexerConfig,
    /// Reasoning settings
    pub reasoning: ReasoningConfig,
    /// Profile-specific overrides
    pub profiles: HashMap<String, ProfileConfig>,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Report format (text, json)
    pub format: OutputFormat,
    /// Logging level
    pub log_level: LogLevel,
}

/// Lexer configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerConfig {
    /// Inputs larger than this many bytes are rejected
    pub max_input_bytes: usize,
    /// Keep comments as tokens (shown by `--tokens`)
    pub preserve_comments: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            preserve_comments: false,
        }
    }
}

/// Reasoning configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Reasoning profile to use
    pub profile: ReasoningProfile,
    /// Maximum forward-chaining rounds
    pub max_steps: usize,
    /// Backward-chaining depth cap
    pub max_depth: usize,
    /// Facts considered for pairwise conjunction introduction
    pub conjunction_cap: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            profile: ReasoningProfile::Default,
            max_steps: ReasoningProfile::Default.default_max_steps(),
            max_depth: engine.max_depth,
            conjunction_cap: engine.conjunction_cap,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfileConfig {
    /// Override max_steps
    pub max_steps: Option<usize>,
    /// Override max_depth
    pub max_depth: Option<usize>,
    /// Override conjunction_cap
    pub conjunction_cap: Option<usize>,
    /// Description of the profile
    pub description: Option<String>,
}

// ============================================================================
// Enums
// ============================================================================

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "aiql" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn",
            LogLevel::Verbose => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Reasoning profile presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningProfile {
    /// Balanced limits
    #[default]
    Default,
    /// Few rounds, shallow proofs
    Shallow,
    /// Many rounds, deep proofs
    Deep,
    /// Custom profile (use profiles section)
    Custom,
}

impl ReasoningProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningProfile::Default => "default",
            ReasoningProfile::Shallow => "shallow",
            ReasoningProfile::Deep => "deep",
            ReasoningProfile::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" | "" => Some(ReasoningProfile::Default),
            "shallow" | "fast" => Some(ReasoningProfile::Shallow),
            "deep" | "thorough" => Some(ReasoningProfile::Deep),
            "custom" => Some(ReasoningProfile::Custom),
            _ => None,
        }
    }

    /// Get the recommended max_steps for this profile
    pub fn default_max_steps(&self) -> usize {
        match self {
            ReasoningProfile::Default | ReasoningProfile::Custom => 100,
            ReasoningProfile::Shallow => 10,
            ReasoningProfile::Deep => 1000,
        }
    }

    /// Get the recommended max_depth for this profile
    pub fn default_max_depth(&self) -> usize {
        match self {
            ReasoningProfile::Default | ReasoningProfile::Custom => 20,
            ReasoningProfile::Shallow => 8,
            ReasoningProfile::Deep => 64,
        }
    }

    /// Get a description of this profile
    pub fn description(&self) -> &'static str {
        match self {
            ReasoningProfile::Default => "Balanced forward rounds and proof depth",
            ReasoningProfile::Shallow => "Few forward rounds and shallow proofs",
            ReasoningProfile::Deep => "Many forward rounds and deep proofs",
            ReasoningProfile::Custom => "User-defined profile",
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl AiqlConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations
    ///
    /// Searches for config files in order:
    /// 1. ./aiql.toml
    /// 2. ~/.config/aiql/config.toml
    /// 3. ~/.aiql/config.toml
    /// 4. /etc/aiql/config.toml
    ///
    /// Then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let config: AiqlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./aiql.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("aiql").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".aiql").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/aiql/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Apply overrides from any `AIQL_*` variable lookup; unparsable values
    /// are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("AIQL_PROFILE") {
            if let Some(profile) = ReasoningProfile::from_str(&val) {
                self.reasoning.profile = profile;
            }
        }

        if let Some(val) = lookup("AIQL_MAX_STEPS") {
            if let Ok(steps) = val.parse::<usize>() {
                self.reasoning.max_steps = steps;
            }
        }

        if let Some(val) = lookup("AIQL_MAX_DEPTH") {
            if let Ok(depth) = val.parse::<usize>() {
                self.reasoning.max_depth = depth;
            }
        }

        if let Some(val) = lookup("AIQL_LOG_LEVEL") {
            if let Some(level) = LogLevel::from_str(&val) {
                self.general.log_level = level;
            }
        }

        if let Some(val) = lookup("AIQL_FORMAT") {
            if let Some(format) = OutputFormat::from_str(&val) {
                self.general.format = format;
            }
        }

        if let Some(val) = lookup("AIQL_MAX_INPUT_BYTES") {
            if let Ok(bytes) = val.parse::<usize>() {
                self.lexer.max_input_bytes = bytes;
            }
        }
    }

    /// Apply a named profile's settings
    pub fn apply_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if let Some(profile) = ReasoningProfile::from_str(name) {
            if profile != ReasoningProfile::Custom {
                self.reasoning.profile = profile;
                self.reasoning.max_steps = profile.default_max_steps();
                self.reasoning.max_depth = profile.default_max_depth();
                return Ok(());
            }
        }

        if let Some(custom) = self.profiles.get(name).cloned() {
            self.reasoning.profile = ReasoningProfile::Custom;
            if let Some(max_steps) = custom.max_steps {
                self.reasoning.max_steps = max_steps;
            }
            if let Some(max_depth) = custom.max_depth {
                self.reasoning.max_depth = max_depth;
            }
            if let Some(cap) = custom.conjunction_cap {
                self.reasoning.conjunction_cap = cap;
            }
            return Ok(());
        }

        Err(ConfigError::UnknownProfile(name.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reasoning.max_depth == 0 {
            return Err(ConfigError::InvalidValue(
                "reasoning.max_depth".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.lexer.max_input_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "lexer.max_input_bytes".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Lexer options derived from this configuration
    pub fn lexer_options(&self) -> LexerOptions {
        LexerOptions {
            max_input_bytes: self.lexer.max_input_bytes,
            preserve_comments: self.lexer.preserve_comments,
        }
    }

    /// Engine limits derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_depth: self.reasoning.max_depth,
            conjunction_cap: self.reasoning.conjunction_cap,
        }
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Write configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# AIQL Configuration File

[general]
# Report format: text, json
format = "text"
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

[lexer]
# Reject inputs larger than this many bytes
max_input_bytes = 10485760
# Keep comments as tokens
preserve_comments = false

[reasoning]
# Reasoning profile: default, shallow, deep
profile = "default"
# Maximum forward-chaining rounds
max_steps = 100
# Backward-chaining depth cap
max_depth = 20
# Facts paired for conjunction introduction
conjunction_cap = 10

# Custom profiles can be defined like this:
# [profiles.audit]
# max_steps = 500
# max_depth = 40
# description = "Exhaustive audit run"
"#
    }

    /// List all available profiles
    pub fn available_profiles(&self) -> Vec<(&str, &str)> {
        let mut profiles = vec![
            ("default", ReasoningProfile::Default.description()),
            ("shallow", ReasoningProfile::Shallow.description()),
            ("deep", ReasoningProfile::Deep.description()),
        ];

        for (name, config) in &self.profiles {
            let desc = config.description.as_deref().unwrap_or("Custom profile");
            profiles.push((name.as_str(), desc));
        }

        profiles
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error reading/writing config file
    IoError(PathBuf, String),
    /// Parse error in config file
    ParseError(PathBuf, String),
    /// Serialization error
    SerializeError(String),
    /// Unknown profile name
    UnknownProfile(String),
    /// Value out of range (key, reason)
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "IO error reading {}: {}", path.display(), msg)
            }
            ConfigError::ParseError(path, msg) => {
                write!(f, "Parse error in {}: {}", path.display(), msg)
            }
            ConfigError::SerializeError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ConfigError::UnknownProfile(name) => {
                write!(f, "Unknown profile: {}", name)
            }
            ConfigError::InvalidValue(key, reason) => {
                write!(f, "Invalid value for {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AiqlConfig::new();
        assert_eq!(config.reasoning.max_steps, 100);
        assert_eq!(config.reasoning.max_depth, 20);
        assert_eq!(config.reasoning.conjunction_cap, 10);
        assert_eq!(config.lexer.max_input_bytes, 10 * 1024 * 1024);
        assert_eq!(config.general.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            format = "json"
            log_level = "verbose"

            [lexer]
            preserve_comments = true

            [reasoning]
            max_steps = 500
            profile = "deep"
        "#;

        let config = AiqlConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert!(config.lexer.preserve_comments);
        assert_eq!(config.reasoning.max_steps, 500);
        assert_eq!(config.reasoning.profile, ReasoningProfile::Deep);
        // Unset keys keep their defaults
        assert_eq!(config.reasoning.max_depth, 20);
    }

    #[test]
    fn test_invalid_toml() {
        let result = AiqlConfig::load_from_str("[reasoning\nmax_steps = ");
        assert!(matches!(result, Err(ConfigError::ParseError(..))));
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(ReasoningProfile::from_str("shallow"), Some(ReasoningProfile::Shallow));
        assert_eq!(ReasoningProfile::from_str("DEEP"), Some(ReasoningProfile::Deep));
        assert_eq!(ReasoningProfile::from_str("unknown"), None);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::from_str("quiet"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::Quiet.filter_directive(), "error");
        assert_eq!(LogLevel::Debug.filter_directive(), "debug");
    }

    #[test]
    fn test_apply_profile() {
        let mut config = AiqlConfig::new();

        config.apply_profile("shallow").unwrap();
        assert_eq!(config.reasoning.profile, ReasoningProfile::Shallow);
        assert_eq!(config.reasoning.max_steps, 10);
        assert_eq!(config.reasoning.max_depth, 8);

        config.apply_profile("deep").unwrap();
        assert_eq!(config.reasoning.max_steps, 1000);
        assert_eq!(config.engine_config().max_depth, 64);
    }

    #[test]
    fn test_custom_profile() {
        let toml = r#"
            [profiles.audit]
            max_steps = 250
            max_depth = 30
            description = "Audit run"
        "#;

        let mut config = AiqlConfig::load_from_str(toml).unwrap();
        config.apply_profile("audit").unwrap();

        assert_eq!(config.reasoning.profile, ReasoningProfile::Custom);
        assert_eq!(config.reasoning.max_steps, 250);
        assert_eq!(config.reasoning.max_depth, 30);
        assert!(config
            .available_profiles()
            .iter()
            .any(|(name, desc)| *name == "audit" && *desc == "Audit run"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AIQL_PROFILE", "shallow"),
            ("AIQL_MAX_STEPS", "7"),
            ("AIQL_MAX_DEPTH", "not-a-number"),
            ("AIQL_FORMAT", "json"),
            ("AIQL_MAX_INPUT_BYTES", "2048"),
        ]
        .into_iter()
        .collect();

        let mut config = AiqlConfig::new();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.reasoning.profile, ReasoningProfile::Shallow);
        assert_eq!(config.reasoning.max_steps, 7);
        assert_eq!(config.reasoning.max_depth, 20);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.lexer_options().max_input_bytes, 2048);
    }

    #[test]
    fn test_validate() {
        let mut config = AiqlConfig::new();
        config.reasoning.max_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(..))));
    }

    #[test]
    fn test_default_content_parses() {
        let config = AiqlConfig::load_from_str(AiqlConfig::default_config_content()).unwrap();
        assert_eq!(config.reasoning.max_steps, 100);
        assert_eq!(config.lexer.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
    }

    #[test]
    fn test_serialize_config() {
        let config = AiqlConfig::new();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[reasoning]"));
        assert!(toml.contains("[lexer]"));
    }

    #[test]
    fn test_config_paths() {
        let paths = AiqlConfig::config_paths();
        assert!(paths[0].ends_with("aiql.toml"));
    }

    #[test]
    fn test_unknown_profile_error() {
        let mut config = AiqlConfig::new();
        let result = config.apply_profile("nonexistent");
        assert!(matches!(result, Err(ConfigError::UnknownProfile(_))));
    }
}
