//! Validation policy.
//!
//! Runs the enabled analyzers in a fixed order (introspection, depth, aliases,
//! complexity) and stops at the first rejection. The validator holds no
//! per-request state and can be shared freely across threads.

use crate::analyzer::{
    AliasAnalyzer, AnalysisMetrics, Analyzer, ComplexityAnalyzer, DepthAnalyzer,
    IntrospectionAnalyzer,
};
use crate::config::GuardConfig;
use crate::error::{GuardError, Violation};
use crate::parser::{extract_query_text, parse_query};
use crate::schema::Schema;
use std::sync::Arc;
use tracing::{debug, warn};

/// Accept/reject decision for incoming GraphQL documents.
pub struct QueryValidator {
    config: GuardConfig,
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl QueryValidator {
    /// Create a validator after checking the configuration.
    pub fn new(config: GuardConfig) -> Result<Self, GuardError> {
        config.validate()?;
        let analyzers = Self::build_analyzers(&config);
        Ok(Self { config, analyzers })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Build analyzers from configuration, in policy order.
    fn build_analyzers(config: &GuardConfig) -> Vec<Arc<dyn Analyzer>> {
        let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::new();

        analyzers.push(Arc::new(IntrospectionAnalyzer::new(
            config.introspection.clone(),
        )));

        if config.depth.enabled {
            analyzers.push(Arc::new(DepthAnalyzer::new(config.depth.clone())));
        }

        if config.aliases.enabled {
            analyzers.push(Arc::new(AliasAnalyzer::new(config.aliases.clone())));
        }

        if config.complexity.enabled {
            analyzers.push(Arc::new(ComplexityAnalyzer::new(config.complexity.clone())));
        }

        analyzers
    }

    /// Decide whether a request body is safe to execute.
    ///
    /// Empty bodies and bodies that fail to parse are allowed: syntax errors are
    /// left for the executor to report. Well-formed documents nested beyond the
    /// parser's recursion limit cannot be analyzed and are rejected.
    pub fn validate(&self, body: &str, schema: &Schema) -> Result<(), Violation> {
        self.analyze(body, schema).map(|_| ())
    }

    /// Same policy as [`validate`](Self::validate), returning the metrics that
    /// were gathered when the request is allowed.
    pub fn analyze(&self, body: &str, _schema: &Schema) -> Result<AnalysisMetrics, Violation> {
        let mut metrics = AnalysisMetrics::default();

        if body.is_empty() {
            return Ok(metrics);
        }

        let query = extract_query_text(body);

        let document = match parse_query(&query) {
            Ok(document) => document,
            Err(GuardError::NestingLimit(levels)) => {
                let violation = self.nesting_violation(levels);
                warn!(
                    levels,
                    code = %violation.code,
                    "GraphQL query rejected: nesting exceeds parser limit"
                );
                return Err(violation);
            }
            Err(e) => {
                debug!(error = %e, "Query did not parse, deferring to executor");
                return Ok(metrics);
            }
        };
        metrics.parsed = true;

        for analyzer in &self.analyzers {
            if let Err(violation) = analyzer.analyze(&document, &mut metrics) {
                warn!(
                    analyzer = analyzer.name(),
                    code = %violation.code,
                    actual = ?violation.actual(),
                    max = ?violation.limit(),
                    "GraphQL query rejected"
                );
                return Err(violation);
            }
        }

        debug!(
            depth = ?metrics.depth,
            aliases = ?metrics.aliases,
            complexity = ?metrics.complexity,
            "GraphQL query passed security checks"
        );
        Ok(metrics)
    }

    fn nesting_violation(&self, levels: u32) -> Violation {
        let depth = &self.config.depth;
        if depth.enabled && levels > depth.max_depth {
            Violation::depth_exceeded(levels, depth.max_depth)
        } else {
            Violation::nesting_too_deep(levels)
        }
    }
}
