//! Error types and GraphQL-compliant error responses.

use crate::ast::Location;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Reasons a request is rejected before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// Document selects `__schema` or `__type`
    IntrospectionDisabled,
    /// Query depth exceeds limit
    DepthExceeded,
    /// Too many aliases in query
    TooManyAliases,
    /// Query complexity exceeds limit
    ComplexityExceeded,
    /// Request could not be read (e.g. body too large)
    InvalidRequest,
}

impl ViolationCode {
    /// Get the code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntrospectionDisabled => "INTROSPECTION_DISABLED",
            Self::DepthExceeded => "DEPTH_EXCEEDED",
            Self::TooManyAliases => "TOO_MANY_ALIASES",
            Self::ComplexityExceeded => "COMPLEXITY_EXCEEDED",
            Self::InvalidRequest => "INVALID_REQUEST",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rejection produced by the validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Violation code
    pub code: ViolationCode,
    /// Human-readable message
    pub message: String,
    /// Source locations (if applicable)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Limit and observed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ViolationExtensions>,
}

/// The configured limit alongside the value that broke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationExtensions {
    pub actual: u64,
    pub max: u64,
}

impl Violation {
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            locations: Vec::new(),
            extensions: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    fn with_limit(mut self, actual: u64, max: u64) -> Self {
        self.extensions = Some(ViolationExtensions { actual, max });
        self
    }

    /// Introspection rejection. Carries a fixed message.
    pub fn introspection_disabled() -> Self {
        Self::new(
            ViolationCode::IntrospectionDisabled,
            "GraphQL introspection is disabled",
        )
    }

    pub fn depth_exceeded(actual: u32, max: u32) -> Self {
        Self::new(
            ViolationCode::DepthExceeded,
            format!(
                "query depth exceeds maximum allowed depth of {} (actual: {})",
                max, actual
            ),
        )
        .with_limit(actual.into(), max.into())
    }

    pub fn too_many_aliases(actual: u32, max: u32) -> Self {
        Self::new(
            ViolationCode::TooManyAliases,
            format!(
                "query contains too many aliases. Maximum allowed: {}, found: {}",
                max, actual
            ),
        )
        .with_limit(actual.into(), max.into())
    }

    pub fn complexity_exceeded(actual: u64, max: u64) -> Self {
        Self::new(
            ViolationCode::ComplexityExceeded,
            format!(
                "query complexity exceeds maximum allowed complexity of {} (actual: {})",
                max, actual
            ),
        )
        .with_limit(actual, max)
    }

    /// Document nested deeper than the parser can descend, with no depth limit
    /// to report against.
    pub fn nesting_too_deep(levels: u32) -> Self {
        Self::new(
            ViolationCode::DepthExceeded,
            format!(
                "query nesting of {} levels is too deep to analyze",
                levels
            ),
        )
    }

    /// Request body larger than the configured maximum.
    pub fn body_too_large(max: usize) -> Self {
        Self::new(
            ViolationCode::InvalidRequest,
            format!("Request body too large (max: {} bytes)", max),
        )
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::new(ViolationCode::InvalidRequest, message)
    }

    /// The limit that was exceeded, if this rejection carries one.
    pub fn limit(&self) -> Option<u64> {
        self.extensions.map(|ext| ext.max)
    }

    /// The observed value, if this rejection carries one.
    pub fn actual(&self) -> Option<u64> {
        self.extensions.map(|ext| ext.actual)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Violation {}

/// Guard errors.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query nesting ({0} levels) exceeds the parser's recursion limit")]
    NestingLimit(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build a GraphQL-compliant error response.
///
/// The transport pairs this body with a client-error status.
pub fn graphql_error_response(violations: &[Violation]) -> Value {
    json!({
        "errors": violations.iter().map(|v| {
            let mut error = json!({
                "message": v.message,
                "extensions": {
                    "code": v.code.as_str(),
                }
            });

            if !v.locations.is_empty() {
                error["locations"] = json!(v.locations);
            }

            if let Some(ext) = &v.extensions {
                error["extensions"]["actual"] = json!(ext.actual);
                error["extensions"]["max"] = json!(ext.max);
            }

            error
        }).collect::<Vec<_>>()
    })
}
