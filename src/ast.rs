//! Owned GraphQL document tree consumed by the analyzers.
//!
//! The tree is built once per request by [`crate::parser::parse_query`] and is
//! never mutated afterwards. Node variants are closed enums so every analyzer
//! matches them exhaustively.

use serde::{Deserialize, Serialize};

/// A source location in the GraphQL document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// A parsed request document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Iterate the bodies of all top-level definitions that have one.
    pub fn selection_sets(&self) -> impl Iterator<Item = &SelectionSet> {
        self.definitions.iter().filter_map(Definition::selection_set)
    }
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

impl Definition {
    /// The definition's body, if any.
    pub fn selection_set(&self) -> Option<&SelectionSet> {
        match self {
            Self::Operation(op) => op.selection_set.as_ref(),
            Self::Fragment(frag) => frag.selection_set.as_ref(),
        }
    }
}

/// Kind of an operation definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// A named or anonymous operation. The `{ ... }` shorthand is an anonymous query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub selection_set: Option<SelectionSet>,
    pub location: Location,
}

/// A named, reusable fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub selection_set: Option<SelectionSet>,
    pub location: Location,
}

/// The braces-delimited list of selections at one nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    pub selections: Vec<Selection>,
}

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    FragmentSpread(FragmentSpread),
}

/// A field selection. Leaf fields have no `selection_set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    pub selection_set: Option<SelectionSet>,
    pub location: Location,
}

impl Field {
    /// Whether the field carries a non-empty alias.
    pub fn is_aliased(&self) -> bool {
        self.alias.as_deref().is_some_and(|alias| !alias.is_empty())
    }
}

/// `... on Type { ... }` or `... @dir { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub selection_set: Option<SelectionSet>,
    pub location: Location,
}

/// `...FragmentName`. Never expanded by the analyzers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSpread {
    pub fragment_name: String,
    pub location: Location,
}
