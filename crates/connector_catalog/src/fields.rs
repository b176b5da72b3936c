use std::fmt;

use serde::Serialize;

use crate::mask::SelectionMask;
use crate::tree::{selection_to_tree, FieldTree};

/// A named field of a structured query and the sub-fields selected beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryField {
    pub name: String,
    pub fields: Vec<QueryField>,
}

impl QueryField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<QueryField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Renders as a GraphQL-style selection: `name` or `name { child ... }`.
impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        write_selection_set(f, &self.fields)
    }
}

fn write_selection_set(f: &mut fmt::Formatter<'_>, fields: &[QueryField]) -> fmt::Result {
    if fields.is_empty() {
        return Ok(());
    }
    f.write_str(" {")?;
    for field in fields {
        write!(f, " {field}")?;
    }
    f.write_str(" }")
}

/// Renders each node of `tree` as a field carrying its own rendered children.
pub fn tree_to_fields(tree: &FieldTree) -> Vec<QueryField> {
    tree.iter()
        .map(|(name, subtree)| QueryField::new(name).with_fields(tree_to_fields(subtree)))
        .collect()
}

/// Query fields mirroring exactly the selected paths of `mask`.
pub fn selection_to_fields(mask: &SelectionMask) -> Vec<QueryField> {
    tree_to_fields(&selection_to_tree(mask))
}

/// A top-level query, e.g. `countries { code name }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    pub name: String,
    pub fields: Vec<QueryField>,
}

impl Query {
    pub fn new(name: impl Into<String>, fields: Vec<QueryField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        write_selection_set(f, &self.fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

/// Renders an operation body such as `query { countries { code } }`.
pub fn render_operation(kind: OperationKind, queries: &[Query]) -> String {
    let mut body = String::from(kind.as_str());
    body.push_str(" {");
    for query in queries {
        body.push(' ');
        body.push_str(&query.to_string());
    }
    body.push_str(" }");
    body
}
