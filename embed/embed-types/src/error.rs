//! Error types for model construction.

use thiserror::Error;

/// Result type for model operations.
pub type TypesResult<T> = Result<T, TypesError>;

/// Errors that can occur while building or editing a model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypesError {
    /// An element with this identifier already exists at its dimension.
    #[error("duplicate {dimension}-D element identifier {id}")]
    DuplicateElement {
        /// Element dimension.
        dimension: usize,
        /// The duplicate identifier.
        id: u32,
    },

    /// An element does not have the number of nodes its shape requires.
    #[error("element {id} has {found} nodes but its shape needs {expected}")]
    NodeCountMismatch {
        /// Element identifier.
        id: u32,
        /// Nodes required by the shape.
        expected: usize,
        /// Nodes supplied.
        found: usize,
    },

    /// An element was added to an element set of a different dimension.
    #[error("element {id} of dimension {found} added to a {expected}-D element set")]
    DimensionMismatch {
        /// Element identifier.
        id: u32,
        /// Dimension of the element set.
        expected: usize,
        /// Dimension of the element shape.
        found: usize,
    },

    /// An element references a node that is not in the model.
    #[error("element {element} references unknown node {node}")]
    UnknownNode {
        /// Element identifier.
        element: u32,
        /// Missing node identifier.
        node: u32,
    },

    /// Coordinate fields support one to three components.
    #[error("field '{name}' has {components} components (expected 1 to 3)")]
    InvalidComponentCount {
        /// Field name.
        name: String,
        /// Requested component count.
        components: usize,
    },

    /// A value was supplied with the wrong number of components.
    #[error("field '{name}' expects {expected} components, got {found}")]
    ValueLength {
        /// Field name.
        name: String,
        /// Components of the field.
        expected: usize,
        /// Components supplied.
        found: usize,
    },

    /// A field with this name already exists.
    #[error("field '{name}' already exists")]
    DuplicateField {
        /// The duplicate field name.
        name: String,
    },

    /// The named field was not found.
    #[error("field '{name}' not found")]
    FieldNotFound {
        /// The missing field name.
        name: String,
    },

    /// A group with this name already exists.
    #[error("group '{name}' already exists")]
    DuplicateGroup {
        /// The duplicate group name.
        name: String,
    },
}
