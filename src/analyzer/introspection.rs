//! Introspection detection.

use super::{AnalysisMetrics, Analyzer};
use crate::ast::{Document, Field, Selection, SelectionSet};
use crate::config::IntrospectionConfig;
use crate::error::Violation;

/// Meta-fields that describe the schema rather than application data.
/// `__typename` is not one of them.
pub const INTROSPECTION_FIELDS: [&str; 2] = ["__schema", "__type"];

/// Whether any definition selects `__schema` or `__type`.
pub fn has_introspection(document: &Document) -> bool {
    find_introspection(document).is_some()
}

/// First introspection field in document order, if any.
pub fn find_introspection(document: &Document) -> Option<&Field> {
    document.selection_sets().find_map(find_in_selection_set)
}

fn find_in_selection_set(set: &SelectionSet) -> Option<&Field> {
    set.selections.iter().find_map(|selection| match selection {
        Selection::Field(field) => {
            if INTROSPECTION_FIELDS.contains(&field.name.as_str()) {
                Some(field)
            } else {
                field.selection_set.as_ref().and_then(find_in_selection_set)
            }
        }
        Selection::InlineFragment(fragment) => {
            fragment.selection_set.as_ref().and_then(find_in_selection_set)
        }
        Selection::FragmentSpread(_) => None,
    })
}

/// Rejects introspection unless explicitly allowed.
pub struct IntrospectionAnalyzer {
    config: IntrospectionConfig,
}

impl IntrospectionAnalyzer {
    pub fn new(config: IntrospectionConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for IntrospectionAnalyzer {
    fn name(&self) -> &'static str {
        "introspection"
    }

    fn analyze(&self, document: &Document, metrics: &mut AnalysisMetrics) -> Result<(), Violation> {
        let found = find_introspection(document);
        metrics.introspection = Some(found.is_some());

        match found {
            Some(field) if !self.config.allow => {
                Err(Violation::introspection_disabled().with_location(field.location))
            }
            _ => Ok(()),
        }
    }
}
