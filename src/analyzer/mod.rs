//! Document analyzers.
//!
//! Each analyzer is a pure walk over an immutable [`Document`]. Fragment spreads
//! are never resolved to their definitions: a fragment body is only analyzed when
//! it is visited as a top-level definition.

mod aliases;
mod complexity;
mod depth;
mod introspection;

pub use aliases::{alias_count, AliasAnalyzer};
pub use complexity::{complexity, ComplexityAnalyzer};
pub use depth::{depth, DepthAnalyzer};
pub use introspection::{find_introspection, has_introspection, IntrospectionAnalyzer};

use crate::ast::Document;
use crate::error::Violation;
use serde::Serialize;

/// Metrics gathered while analyzing one document.
///
/// A metric is `None` when its analyzer is disabled or did not run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisMetrics {
    /// Whether the body parsed into a document at all
    pub parsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introspection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u64>,
}

/// One check of the validation policy.
pub trait Analyzer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Record this analyzer's metric, then reject if it breaks the configured limit.
    fn analyze(&self, document: &Document, metrics: &mut AnalysisMetrics) -> Result<(), Violation>;
}
