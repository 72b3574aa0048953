//! Alias counting.

use super::{AnalysisMetrics, Analyzer};
use crate::ast::{Document, Selection, SelectionSet};
use crate::config::AliasConfig;
use crate::error::Violation;

/// Total number of aliased fields in the document, summed across all branches.
pub fn alias_count(document: &Document) -> u32 {
    document.selection_sets().map(selection_set_aliases).sum()
}

fn selection_set_aliases(set: &SelectionSet) -> u32 {
    set.selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => {
                u32::from(field.is_aliased())
                    + field.selection_set.as_ref().map_or(0, selection_set_aliases)
            }
            Selection::InlineFragment(fragment) => {
                fragment.selection_set.as_ref().map_or(0, selection_set_aliases)
            }
            // Counted when the fragment definition itself is visited.
            Selection::FragmentSpread(_) => 0,
        })
        .sum()
}

/// Rejects documents with more than `max_aliases` aliased fields.
pub struct AliasAnalyzer {
    config: AliasConfig,
}

impl AliasAnalyzer {
    pub fn new(config: AliasConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for AliasAnalyzer {
    fn name(&self) -> &'static str {
        "aliases"
    }

    fn analyze(&self, document: &Document, metrics: &mut AnalysisMetrics) -> Result<(), Violation> {
        let actual = alias_count(document);
        metrics.aliases = Some(actual);

        if actual > self.config.max_aliases {
            return Err(Violation::too_many_aliases(actual, self.config.max_aliases));
        }
        Ok(())
    }
}
