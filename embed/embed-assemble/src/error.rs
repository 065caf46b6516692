//! Error types for output assembly.

use embed_types::TypesError;
use thiserror::Error;

/// Errors that can occur during output assembly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssembleError {
    /// The data coordinates field is missing from the dataset.
    #[error("data coordinates field '{name}' not found in dataset")]
    DataCoordinatesNotFound {
        /// Field name.
        name: String,
    },

    /// Building the filtered copy failed.
    #[error(transparent)]
    Types(#[from] TypesError),
}

/// Result type for output assembly.
pub type AssembleResult<T> = Result<T, AssembleError>;
