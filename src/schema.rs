//! Executable schema handle.
//!
//! The guard only needs to know which root fields the executor serves. No analyzer
//! consults it yet; validation takes it so type-aware checks can be added without
//! changing the call signature.

use crate::error::GuardError;
use std::collections::HashSet;

/// Root query and mutation fields served by the downstream executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    query_fields: Vec<String>,
    mutation_fields: Vec<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn query_fields(&self) -> &[String] {
        &self.query_fields
    }

    pub fn mutation_fields(&self) -> &[String] {
        &self.mutation_fields
    }

    pub fn has_query_field(&self, name: &str) -> bool {
        self.query_fields.iter().any(|f| f == name)
    }

    pub fn has_mutation_field(&self, name: &str) -> bool {
        self.mutation_fields.iter().any(|f| f == name)
    }
}

/// The hello-world schema: a `hello` query and an `echo` mutation.
impl Default for Schema {
    fn default() -> Self {
        Self {
            query_fields: vec!["hello".to_string()],
            mutation_fields: vec!["echo".to_string()],
        }
    }
}

/// Collects root field names and checks them on [`SchemaBuilder::build`].
///
/// A schema may have only queries, only mutations, both, or neither.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    query_fields: Vec<String>,
    mutation_fields: Vec<String>,
}

impl SchemaBuilder {
    pub fn query_field(mut self, name: impl Into<String>) -> Self {
        self.query_fields.push(name.into());
        self
    }

    pub fn mutation_field(mut self, name: impl Into<String>) -> Self {
        self.mutation_fields.push(name.into());
        self
    }

    pub fn build(self) -> Result<Schema, GuardError> {
        check_fields("Query", &self.query_fields)?;
        check_fields("Mutation", &self.mutation_fields)?;

        Ok(Schema {
            query_fields: self.query_fields,
            mutation_fields: self.mutation_fields,
        })
    }
}

fn check_fields(root: &str, fields: &[String]) -> Result<(), GuardError> {
    let mut seen = HashSet::new();
    for name in fields {
        if !is_valid_name(name) {
            return Err(GuardError::Config(format!(
                "invalid field name '{}' on {}",
                name, root
            )));
        }
        if name.starts_with("__") {
            return Err(GuardError::Config(format!(
                "field name '{}' on {} uses the reserved '__' prefix",
                name, root
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(GuardError::Config(format!(
                "duplicate field '{}' on {}",
                name, root
            )));
        }
    }
    Ok(())
}

/// `/[_A-Za-z][_0-9A-Za-z]*/`
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
