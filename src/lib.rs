//! Pre-execution safety gate for GraphQL requests.
//!
//! Decides whether a request document is safe to execute before any resolver
//! runs. Each document is analyzed fresh and in isolation; nothing is cached
//! across requests.
//!
//! # Features
//!
//! - Query depth limiting (prevent deeply nested queries)
//! - Alias limiting (prevent alias-based attacks)
//! - Complexity analysis with cost doubling per nesting level
//! - Introspection control (`__schema` / `__type`)
//! - axum middleware with bearer-token extraction and error sanitization
//!
//! # Example
//!
//! ```ignore
//! use graphql_query_guard::{GuardConfig, QueryValidator, Schema};
//!
//! let validator = QueryValidator::new(GuardConfig::default())?;
//! validator.validate(r#"{"query": "{ hello }"}"#, &Schema::default())?;
//! ```

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod error;
pub mod middleware;
pub mod parser;
pub mod sanitize;
pub mod schema;
pub mod validator;

pub use analyzer::AnalysisMetrics;
pub use config::GuardConfig;
pub use error::{graphql_error_response, GuardError, Violation, ViolationCode};
pub use middleware::{guard_middleware, protect, BearerToken, QueryGuard, TokenExtractor};
pub use schema::Schema;
pub use validator::QueryValidator;
