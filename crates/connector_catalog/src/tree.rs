use std::collections::HashMap;

use crate::mask::SelectionMask;

/// Hierarchy of selected field names. The root holds a query's top-level fields.
///
/// Children keep the order in which they were first inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree {
    children: Vec<(String, FieldTree)>,
    index: HashMap<String, usize>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts every segment of `path`, creating missing intermediate nodes.
    pub fn insert_path<S: AsRef<str>>(&mut self, path: &[S]) {
        let mut node = self;
        for segment in path {
            node = node.child_mut(segment.as_ref());
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut FieldTree {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.children.len();
                self.index.insert(name.to_string(), idx);
                self.children.push((name.to_string(), FieldTree::new()));
                idx
            }
        };
        &mut self.children[idx].1
    }

    pub fn get(&self, name: &str) -> Option<&FieldTree> {
        self.index.get(name).map(|&idx| &self.children[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldTree)> {
        self.children
            .iter()
            .map(|(name, subtree)| (name.as_str(), subtree))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// A leaf is a scalar field, or a field selected without any of its children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Builds the tree of every selected path in `mask`. Unselected paths contribute nothing.
pub fn selection_to_tree(mask: &SelectionMask) -> FieldTree {
    let mut tree = FieldTree::new();
    for path in mask.selected_paths() {
        tree.insert_path(path.segments());
    }
    tree
}
