//! Error types for mesh location search.

use thiserror::Error;

/// Errors that can occur while building a location resolver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LocateError {
    /// The host model has no elements.
    #[error("host model has no elements")]
    EmptyHost,

    /// The fitted coordinates field is not defined on any search element.
    #[error("fitted coordinates field '{field}' is not defined on any {dimension}-D host element")]
    EmptyFittedDomain {
        /// Fitted coordinates field name.
        field: String,
        /// Search dimension.
        dimension: usize,
    },

    /// The projection group has no elements.
    #[error("projection group '{name}' has no elements")]
    EmptyProjectionGroup {
        /// Projection group name.
        name: String,
    },

    /// The fitted field has too few components for the exact search.
    #[error("field '{field}' has {components} components but the search needs {dimension}")]
    ComponentMismatch {
        /// Field name.
        field: String,
        /// Components of the field.
        components: usize,
        /// Search dimension.
        dimension: usize,
    },
}

/// Result type for location search.
pub type LocateResult<T> = Result<T, LocateError>;
