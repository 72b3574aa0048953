//! Query depth analysis.

use super::{AnalysisMetrics, Analyzer};
use crate::ast::{Document, Selection, SelectionSet};
use crate::config::DepthConfig;
use crate::error::Violation;

/// Maximum field nesting depth of the document.
///
/// Definitions themselves do not count as a level, inline fragments do not add
/// one, and a fragment spread sits at its parent's depth.
pub fn depth(document: &Document) -> u32 {
    document
        .selection_sets()
        .map(|set| selection_set_depth(set, 0))
        .max()
        .unwrap_or(0)
}

fn selection_set_depth(set: &SelectionSet, current: u32) -> u32 {
    set.selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => match &field.selection_set {
                Some(nested) => selection_set_depth(nested, current + 1),
                None => current + 1,
            },
            Selection::InlineFragment(fragment) => match &fragment.selection_set {
                Some(nested) => selection_set_depth(nested, current),
                None => current,
            },
            Selection::FragmentSpread(_) => current,
        })
        .fold(current, u32::max)
}

/// Rejects documents nested deeper than `max_depth`.
pub struct DepthAnalyzer {
    config: DepthConfig,
}

impl DepthAnalyzer {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for DepthAnalyzer {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn analyze(&self, document: &Document, metrics: &mut AnalysisMetrics) -> Result<(), Violation> {
        let actual = depth(document);
        metrics.depth = Some(actual);

        if actual > self.config.max_depth {
            return Err(Violation::depth_exceeded(actual, self.config.max_depth));
        }
        Ok(())
    }
}
