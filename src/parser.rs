//! Request extraction and GraphQL parsing.
//!
//! Parsing is delegated to `graphql-parser`; its borrowed AST is converted into
//! the owned tree in [`crate::ast`] so analysis never depends on parser internals.

use crate::ast::{
    Definition, Document, Field, FragmentDefinition, FragmentSpread, InlineFragment, Location,
    OperationDefinition, OperationKind, Selection, SelectionSet,
};
use crate::error::GuardError;
use graphql_parser::query as q;
use graphql_parser::Pos;
use std::borrow::Cow;

type Text<'a> = &'a str;

/// `graphql-parser` stops descending after a fixed number of nested levels and
/// reports it with this message. Such documents are well-formed, just too deep.
const RECURSION_LIMIT_MESSAGE: &str = "Recursion limit exceeded";

/// Normalize a request body into query text.
///
/// A JSON object with a string `query` property yields that string; anything else
/// (raw GraphQL, JSON without `query`, non-object JSON) is returned untouched.
pub fn extract_query_text(body: &str) -> Cow<'_, str> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(mut map)) => match map.remove("query") {
            Some(serde_json::Value::String(query)) => Cow::Owned(query),
            _ => Cow::Borrowed(body),
        },
        _ => Cow::Borrowed(body),
    }
}

/// Read the `query` parameter of a URL query string.
pub fn query_from_url(query_string: &str) -> Option<String> {
    first_query_pair(serde_urlencoded::from_str(query_string).ok()?)
}

/// Read the `query` field of an `application/x-www-form-urlencoded` body.
pub fn query_from_form(body: &[u8]) -> Option<String> {
    first_query_pair(serde_urlencoded::from_bytes(body).ok()?)
}

fn first_query_pair(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value)
}

/// Parse query text into a [`Document`].
pub fn parse_query(text: &str) -> Result<Document, GuardError> {
    let document = graphql_parser::parse_query::<Text<'_>>(text).map_err(|e| {
        let message = e.to_string();
        if message.contains(RECURSION_LIMIT_MESSAGE) {
            GuardError::NestingLimit(brace_depth(text))
        } else {
            GuardError::Parse(message)
        }
    })?;

    Ok(Document {
        definitions: document.definitions.iter().map(convert_definition).collect(),
    })
}

/// Deepest `{` nesting in query text, skipping string literals and comments.
///
/// Used as the depth estimate for documents the parser refuses to descend into.
/// For plain field selections it equals the query depth.
pub fn brace_depth(text: &str) -> u32 {
    let mut depth: u32 = 0;
    let mut deepest: u32 = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                depth = depth.saturating_add(1);
                deepest = deepest.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
            }
            '"' => {
                if chars.next_if_eq(&'"').is_some() {
                    if chars.next_if_eq(&'"').is_some() {
                        skip_block_string(&mut chars);
                    }
                    // `""` is an empty string
                } else {
                    skip_string(&mut chars);
                }
            }
            _ => {}
        }
    }

    deepest
}

fn skip_string(chars: &mut impl Iterator<Item = char>) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' | '\n' => return,
            _ => {}
        }
    }
}

fn skip_block_string(chars: &mut impl Iterator<Item = char>) {
    let mut quotes = 0;
    for c in chars {
        if c == '"' {
            quotes += 1;
            if quotes == 3 {
                return;
            }
        } else {
            quotes = 0;
        }
    }
}

fn convert_definition<'a>(definition: &q::Definition<'a, Text<'a>>) -> Definition {
    match definition {
        q::Definition::Operation(op) => Definition::Operation(convert_operation(op)),
        q::Definition::Fragment(frag) => Definition::Fragment(FragmentDefinition {
            name: frag.name.to_string(),
            type_condition: type_condition_name(&frag.type_condition),
            selection_set: convert_selection_set(&frag.selection_set),
            location: location(frag.position),
        }),
    }
}

fn convert_operation<'a>(op: &q::OperationDefinition<'a, Text<'a>>) -> OperationDefinition {
    let (kind, name, selection_set, position) = match op {
        q::OperationDefinition::SelectionSet(set) => {
            (OperationKind::Query, None, set, set.span.0)
        }
        q::OperationDefinition::Query(query) => (
            OperationKind::Query,
            query.name,
            &query.selection_set,
            query.position,
        ),
        q::OperationDefinition::Mutation(mutation) => (
            OperationKind::Mutation,
            mutation.name,
            &mutation.selection_set,
            mutation.position,
        ),
        q::OperationDefinition::Subscription(subscription) => (
            OperationKind::Subscription,
            subscription.name,
            &subscription.selection_set,
            subscription.position,
        ),
    };

    OperationDefinition {
        kind,
        name: name.map(str::to_string),
        selection_set: convert_selection_set(selection_set),
        location: location(position),
    }
}

/// Empty bodies become `None` so leaf fields are distinguishable from composites.
fn convert_selection_set<'a>(set: &q::SelectionSet<'a, Text<'a>>) -> Option<SelectionSet> {
    if set.items.is_empty() {
        return None;
    }

    Some(SelectionSet {
        selections: set.items.iter().map(convert_selection).collect(),
    })
}

fn convert_selection<'a>(selection: &q::Selection<'a, Text<'a>>) -> Selection {
    match selection {
        q::Selection::Field(field) => Selection::Field(Field {
            name: field.name.to_string(),
            alias: field.alias.map(str::to_string),
            selection_set: convert_selection_set(&field.selection_set),
            location: location(field.position),
        }),
        q::Selection::InlineFragment(fragment) => Selection::InlineFragment(InlineFragment {
            type_condition: fragment.type_condition.as_ref().map(type_condition_name),
            selection_set: convert_selection_set(&fragment.selection_set),
            location: location(fragment.position),
        }),
        q::Selection::FragmentSpread(spread) => Selection::FragmentSpread(FragmentSpread {
            fragment_name: spread.fragment_name.to_string(),
            location: location(spread.position),
        }),
    }
}

fn type_condition_name<'a>(condition: &q::TypeCondition<'a, Text<'a>>) -> String {
    match condition {
        q::TypeCondition::On(name) => name.to_string(),
    }
}

fn location(pos: Pos) -> Location {
    Location {
        line: pos.line,
        column: pos.column,
    }
}
