//! Configuration system for cinch.
//!
//! Load engine limits and binder policies from TOML or YAML without code
//! changes.
//!
//! # Examples
//!
//! ```
//! use cinch_config::{CinchConfig, NilValidation};
//!
//! let config = CinchConfig::from_toml_str(r#"
//!     [engine]
//!     max_iterations = 128
//!
//!     [binder]
//!     nil_validation = "reject"
//! "#).unwrap();
//!
//! assert_eq!(config.engine.max_iterations, 128);
//! assert_eq!(config.engine.max_default_rounds, 8);
//! assert_eq!(config.binder.nil_validation, NilValidation::Reject);
//! ```
//!
//! Use the default config when the file is missing:
//!
//! ```
//! use cinch_config::CinchConfig;
//!
//! let config = CinchConfig::load("cinch.toml").unwrap_or_default();
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CinchConfig {
    /// Evaluation limits.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Binder policies.
    #[serde(default)]
    pub binder: BinderConfig,
}

impl CinchConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML or sets
    /// out-of-range limits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()
    }

    /// Sets the fixpoint iteration limit.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.engine.max_iterations = max_iterations;
        self
    }

    /// Sets how many times defaults may be applied.
    pub fn with_max_default_rounds(mut self, rounds: usize) -> Self {
        self.engine.max_default_rounds = rounds;
        self
    }

    /// Sets the policy for validating a top-level `None`.
    pub fn with_nil_validation(mut self, policy: NilValidation) -> Self {
        self.binder.nil_validation = policy;
        self
    }

    /// Sets whether validation requires a concrete result.
    pub fn with_require_concrete(mut self, require: bool) -> Self {
        self.binder.require_concrete = require;
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.engine.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Limits for the fixpoint evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Fixpoint rounds per evaluation phase.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Number of times defaults may be applied before giving up.
    #[serde(default = "default_max_default_rounds")]
    pub max_default_rounds: usize,
}

fn default_max_iterations() -> usize {
    64
}

fn default_max_default_rounds() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_default_rounds: default_max_default_rounds(),
        }
    }
}

/// Policies applied by the binder around the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BinderConfig {
    /// What `validate` does with a top-level `None`.
    #[serde(default)]
    pub nil_validation: NilValidation,

    /// Whether `validate` fails on an incomplete result.
    #[serde(default = "default_require_concrete")]
    pub require_concrete: bool,
}

fn default_require_concrete() -> bool {
    true
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            nil_validation: NilValidation::default(),
            require_concrete: default_require_concrete(),
        }
    }
}

/// Validation policy for a top-level `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NilValidation {
    /// Nothing to check; validation passes.
    #[default]
    Vacuous,

    /// Validation fails.
    Reject,
}
