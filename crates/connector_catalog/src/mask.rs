use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CatalogError;

/// Ordered field names leading from a stream's top level to one field, e.g. `languages.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for FieldPath {
    fn from(segments: [S; N]) -> Self {
        Self::new(segments)
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Which fields of a stream are selected for sync.
///
/// A path is selected only when explicitly marked `true`. Iteration follows first-insertion
/// order; re-inserting a path updates it in place. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct SelectionMask {
    entries: Vec<(FieldPath, bool)>,
    index: HashMap<FieldPath, usize>,
}

impl SelectionMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value for `path`, if any.
    pub fn insert(&mut self, path: impl Into<FieldPath>, selected: bool) -> Option<bool> {
        let path = path.into();
        if let Some(&idx) = self.index.get(&path) {
            let previous = self.entries[idx].1;
            self.entries[idx].1 = selected;
            return Some(previous);
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push((path, selected));
        None
    }

    pub fn is_selected(&self, path: &FieldPath) -> bool {
        self.index
            .get(path)
            .map(|&idx| self.entries[idx].1)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, bool)> {
        self.entries.iter().map(|(path, selected)| (path, *selected))
    }

    pub fn selected_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.iter()
            .filter_map(|(path, selected)| selected.then_some(path))
    }

    /// Builds a mask from catalog breadcrumbs such as
    /// `["properties", "languages", "items", "properties", "name"]`.
    ///
    /// Structural `properties` / `items` segments are dropped; the root breadcrumb is ignored.
    pub fn from_breadcrumbs<I, B, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (B, bool)>,
        B: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mask = Self::new();
        for (breadcrumb, selected) in entries {
            let path = breadcrumb_to_path(breadcrumb);
            if !path.is_empty() {
                mask.insert(path, selected);
            }
        }
        mask
    }

    /// Resolves catalog metadata entries into a mask.
    ///
    /// - `unsupported` fields are never selected; `automatic` fields always are.
    /// - Otherwise `selected` wins, then `selected-by-default`, then the parent's selection.
    /// - A field under a deselected parent is deselected.
    pub fn from_metadata(entries: &[MetadataEntry]) -> Self {
        let resolver = SelectionResolver::new(entries);
        let mut cache = HashMap::new();
        Self::from_breadcrumbs(entries.iter().map(|entry| {
            let selected = resolver.is_selected(&entry.breadcrumb, &mut cache);
            (entry.breadcrumb.iter(), selected)
        }))
    }

    /// Decodes a catalog `metadata` array and resolves it with [`Self::from_metadata`].
    pub fn from_metadata_json(metadata: &Value) -> Result<Self, CatalogError> {
        let entries: Vec<MetadataEntry> = serde_json::from_value(metadata.clone())
            .map_err(|source| CatalogError::Metadata { source })?;
        Ok(Self::from_metadata(&entries))
    }

    /// Selects every property reachable from `schema` through `properties` and array `items`.
    pub fn from_schema(schema: &Value) -> Self {
        let mut mask = Self::new();
        select_properties(schema, &FieldPath::default(), &mut mask);
        mask
    }
}

impl PartialEq for SelectionMask {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(path, selected)| {
                other.index.contains_key(path) && other.is_selected(path) == selected
            })
    }
}

impl Eq for SelectionMask {}

impl<P: Into<FieldPath>> FromIterator<(P, bool)> for SelectionMask {
    fn from_iter<T: IntoIterator<Item = (P, bool)>>(iter: T) -> Self {
        let mut mask = Self::new();
        for (path, selected) in iter {
            mask.insert(path, selected);
        }
        mask
    }
}

fn breadcrumb_to_path<B, S>(breadcrumb: B) -> FieldPath
where
    B: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut segments = Vec::new();
    let mut expect_name = false;
    for segment in breadcrumb {
        let segment = segment.as_ref();
        if expect_name {
            segments.push(segment.to_string());
            expect_name = false;
        } else if segment == "properties" {
            expect_name = true;
        } else if segment != "items" {
            segments.push(segment.to_string());
        }
    }
    FieldPath(segments)
}

fn select_properties(node: &Value, prefix: &FieldPath, mask: &mut SelectionMask) {
    let mut node = node;
    while let Some(items) = node.get("items") {
        node = items;
    }
    let Some(properties) = node.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, child) in properties {
        let path = prefix.child(name);
        mask.insert(path.clone(), true);
        select_properties(child, &path, mask);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Inclusion {
    Available,
    Automatic,
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion: Option<Inclusion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_by_default: Option<bool>,
}

/// One entry of a catalog stream's `metadata` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: FieldMetadata,
}

struct SelectionResolver<'a> {
    by_breadcrumb: HashMap<&'a [String], &'a FieldMetadata>,
}

impl<'a> SelectionResolver<'a> {
    fn new(entries: &'a [MetadataEntry]) -> Self {
        Self {
            by_breadcrumb: entries
                .iter()
                .map(|entry| (entry.breadcrumb.as_slice(), &entry.metadata))
                .collect(),
        }
    }

    fn is_selected(&self, breadcrumb: &'a [String], cache: &mut HashMap<&'a [String], bool>) -> bool {
        if let Some(&selected) = cache.get(breadcrumb) {
            return selected;
        }

        let parent = parent_breadcrumb(breadcrumb).map(|parent| self.is_selected(parent, cache));
        let selected = if parent == Some(false) {
            false
        } else {
            self.own_selection(breadcrumb, parent.unwrap_or(false))
        };
        cache.insert(breadcrumb, selected);
        selected
    }

    fn own_selection(&self, breadcrumb: &[String], parent: bool) -> bool {
        let Some(metadata) = self.by_breadcrumb.get(breadcrumb) else {
            return parent;
        };
        match metadata.inclusion {
            Some(Inclusion::Unsupported) => return false,
            Some(Inclusion::Automatic) => {
                if metadata.selected == Some(false) {
                    warn!(
                        breadcrumb = ?breadcrumb,
                        "field is marked automatic but was deselected; selecting it anyway"
                    );
                }
                return true;
            }
            Some(Inclusion::Available) | None => {}
        }
        if let Some(selected) = metadata.selected.or(metadata.selected_by_default) {
            return selected;
        }
        debug!(
            breadcrumb = ?breadcrumb,
            parent,
            "selection metadata omitted; using parent selection"
        );
        parent
    }
}

/// The breadcrumb of the enclosing field, or the stream root (`[]`) for top-level fields.
///
/// Segments are read the way [`breadcrumb_to_path`] reads them, so a property that is
/// literally named `items` or `properties` is a field, not structure.
fn parent_breadcrumb(breadcrumb: &[String]) -> Option<&[String]> {
    if breadcrumb.is_empty() {
        return None;
    }
    let mut field_ends = Vec::new();
    let mut expect_name = false;
    for (idx, segment) in breadcrumb.iter().enumerate() {
        if expect_name {
            field_ends.push(idx + 1);
            expect_name = false;
        } else if segment == "properties" {
            expect_name = true;
        } else if segment != "items" {
            field_ends.push(idx + 1);
        }
    }
    field_ends.pop();
    let end = field_ends.last().copied().unwrap_or(0);
    Some(&breadcrumb[..end])
}
