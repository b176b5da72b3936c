#![forbid(unsafe_code)]
//! Catalog selection projection.
//!
//! A [`SelectionMask`] says which field paths of a stream the user selected. This crate turns
//! that flat mask into a [`FieldTree`] and then into nested [`QueryField`]s, so a stream can
//! ask its source for exactly the selected fields:
//!
//! ```
//! use connector_catalog::{selection_to_fields, FieldPath, SelectionMask};
//!
//! let mask: SelectionMask = [
//!     (FieldPath::from(["code"]), true),
//!     (FieldPath::from(["languages", "name"]), true),
//!     (FieldPath::from(["emoji"]), false),
//! ]
//! .into_iter()
//! .collect();
//!
//! let fields = selection_to_fields(&mask);
//! let rendered: Vec<String> = fields.iter().map(ToString::to_string).collect();
//! assert_eq!(rendered, ["code", "languages { name }"]);
//! ```

mod error;
mod fields;
mod mask;
mod tree;

pub use error::CatalogError;
pub use fields::{
    render_operation, selection_to_fields, tree_to_fields, OperationKind, Query, QueryField,
};
pub use mask::{FieldMetadata, FieldPath, Inclusion, MetadataEntry, SelectionMask};
pub use tree::{selection_to_tree, FieldTree};
