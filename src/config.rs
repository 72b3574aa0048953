//! Guard configuration.
//!
//! Every section has serde defaults, so an empty YAML document (or no file at all)
//! yields the stock limits: depth 10, aliases 4, complexity 200, introspection off.

use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub settings: SettingsConfig,
    pub depth: DepthConfig,
    pub aliases: AliasConfig,
    pub complexity: ComplexityConfig,
    pub introspection: IntrospectionConfig,
}

impl GuardConfig {
    /// Parse a YAML document. JSON is accepted too, being a YAML subset.
    pub fn from_yaml(content: &str) -> Result<Self, GuardError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings the analyzers cannot work with.
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.complexity.base_weight == 0 {
            return Err(GuardError::Config(
                "complexity.base_weight must be at least 1".to_string(),
            ));
        }
        if self.settings.max_body_size == 0 {
            return Err(GuardError::Config(
                "settings.max_body_size must be greater than 0".to_string(),
            ));
        }
        if self.settings.max_response_size == 0 {
            return Err(GuardError::Config(
                "settings.max_response_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Transport-level behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Skip validation and sanitization entirely (development only)
    pub debug: bool,
    /// Run the validation policy on incoming queries
    pub validation: bool,
    /// Strip "Did you mean ...?" suggestions from executor error messages
    pub sanitize_errors: bool,
    /// Emit X-GraphQL-* metric headers on allowed responses
    pub debug_headers: bool,
    /// Largest request body the gate will buffer
    pub max_body_size: usize,
    /// Largest executor response buffered for sanitization; larger ones pass
    /// through untouched when their size is known up front
    pub max_response_size: usize,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            validation: true,
            sanitize_errors: false,
            debug_headers: false,
            max_body_size: 1024 * 1024,
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub enabled: bool,
    pub max_depth: u32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub enabled: bool,
    pub max_aliases: u32,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_aliases: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    pub enabled: bool,
    pub max_complexity: u64,
    /// Cost of a top-level field; doubles with every nesting level
    pub base_weight: u64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_complexity: 200,
            base_weight: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// Allow `__schema` / `__type` selections
    pub allow: bool,
}
