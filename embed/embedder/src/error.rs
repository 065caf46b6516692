//! Error types for the embedding engine.

use embed_assemble::AssembleError;
use embed_locate::LocateError;
use thiserror::Error;

use crate::engine::EmbedderState;
use crate::source::{LoadError, ModelInput};

/// Errors that can occur while running the embedding engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmbedderError {
    /// An input model could not be loaded.
    #[error("failed to load {input} model: {source}")]
    Load {
        /// Which model failed.
        input: ModelInput,
        /// Underlying loader error.
        #[source]
        source: LoadError,
    },

    /// The operation is not valid in the engine's current state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Operation attempted.
        operation: &'static str,
        /// State at the time.
        state: EmbedderState,
    },

    /// No fitted coordinates field was found on the host.
    #[error("fitted coordinates field unavailable")]
    FittedCoordinatesUnavailable,

    /// No material coordinates field was found on the host.
    #[error("material coordinates field unavailable")]
    MaterialCoordinatesUnavailable,

    /// No data coordinates field was found on the dataset.
    #[error("data coordinates field unavailable")]
    DataCoordinatesUnavailable,

    /// A named coordinate field does not exist.
    #[error("coordinate field '{name}' not found")]
    FieldNotFound {
        /// Field name.
        name: String,
    },

    /// A named group does not exist.
    #[error("group '{name}' not found")]
    GroupNotFound {
        /// Group name.
        name: String,
    },

    /// Building the embedding map failed.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Assembling the output failed.
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Settings could not be encoded or decoded.
    #[error("settings JSON error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result type for the embedding engine.
pub type EmbedderResult<T> = Result<T, EmbedderError>;
