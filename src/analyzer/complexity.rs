//! Weighted complexity scoring.
//!
//! Every field costs the current multiplier and the multiplier doubles for each
//! level of field nesting, so cost grows geometrically with depth. Inline
//! fragments keep the multiplier; a fragment spread costs a flat multiplier
//! regardless of the fragment's shape.

use super::{AnalysisMetrics, Analyzer};
use crate::ast::{Document, Selection, SelectionSet};
use crate::config::ComplexityConfig;
use crate::error::Violation;

/// Complexity of the whole document, summed over all top-level definitions.
///
/// Arithmetic saturates at `u64::MAX`.
pub fn complexity(document: &Document, base_weight: u64) -> u64 {
    document
        .selection_sets()
        .map(|set| selection_set_complexity(set, base_weight))
        .fold(0, u64::saturating_add)
}

fn selection_set_complexity(set: &SelectionSet, multiplier: u64) -> u64 {
    set.selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => {
                let nested = field.selection_set.as_ref().map_or(0, |nested| {
                    selection_set_complexity(nested, multiplier.saturating_mul(2))
                });
                multiplier.saturating_add(nested)
            }
            Selection::InlineFragment(fragment) => fragment
                .selection_set
                .as_ref()
                .map_or(0, |nested| selection_set_complexity(nested, multiplier)),
            Selection::FragmentSpread(_) => multiplier,
        })
        .fold(0, u64::saturating_add)
}

/// Rejects documents scoring above `max_complexity`.
pub struct ComplexityAnalyzer {
    config: ComplexityConfig,
}

impl ComplexityAnalyzer {
    pub fn new(config: ComplexityConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for ComplexityAnalyzer {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn analyze(&self, document: &Document, metrics: &mut AnalysisMetrics) -> Result<(), Violation> {
        let actual = complexity(document, self.config.base_weight);
        metrics.complexity = Some(actual);

        if actual > self.config.max_complexity {
            return Err(Violation::complexity_exceeded(
                actual,
                self.config.max_complexity,
            ));
        }
        Ok(())
    }
}
