//! The loader boundary supplying host and data models.

use std::error::Error as StdError;
use std::fmt;

use embed_types::Model;
use thiserror::Error;

/// The three models an embedding run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelInput {
    /// The full host scaffold with its material coordinates.
    Scaffold,
    /// The host's fitted geometry, in the dataset's coordinate space.
    FittedGeometry,
    /// The dataset to embed.
    Data,
}

impl fmt::Display for ModelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scaffold => "scaffold",
            Self::FittedGeometry => "fitted geometry",
            Self::Data => "data",
        })
    }
}

/// A model could not be read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl LoadError {
    /// Create an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The source has nothing for this input.
    #[must_use]
    pub fn missing(input: ModelInput) -> Self {
        Self::new(format!("no {input} model available"))
    }
}

/// Supplies the models of an embedding run, e.g. by reading files.
pub trait ModelSource {
    /// Load one of the input models.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the model cannot be read.
    fn load(&self, input: ModelInput) -> Result<Model, LoadError>;
}

/// Serves prebuilt models.
///
/// # Example
///
/// ```
/// use embedder::{InMemorySource, ModelInput, ModelSource};
/// use embed_types::Model;
///
/// let source = InMemorySource::new().with_data(Model::new());
/// assert!(source.load(ModelInput::Data).is_ok());
/// assert!(source.load(ModelInput::Scaffold).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    scaffold: Option<Model>,
    fitted: Option<Model>,
    data: Option<Model>,
}

impl InMemorySource {
    /// Create a source with no models.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scaffold model.
    #[must_use]
    pub fn with_scaffold(mut self, model: Model) -> Self {
        self.scaffold = Some(model);
        self
    }

    /// Set the fitted geometry model.
    #[must_use]
    pub fn with_fitted_geometry(mut self, model: Model) -> Self {
        self.fitted = Some(model);
        self
    }

    /// Set the data model.
    #[must_use]
    pub fn with_data(mut self, model: Model) -> Self {
        self.data = Some(model);
        self
    }
}

impl ModelSource for InMemorySource {
    fn load(&self, input: ModelInput) -> Result<Model, LoadError> {
        let model = match input {
            ModelInput::Scaffold => &self.scaffold,
            ModelInput::FittedGeometry => &self.fitted,
            ModelInput::Data => &self.data,
        };
        model.clone().ok_or_else(|| LoadError::missing(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_named() {
        let err = InMemorySource::new()
            .load(ModelInput::FittedGeometry)
            .unwrap_err();
        assert_eq!(err.to_string(), "no fitted geometry model available");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "scaffold.exf");
        let err = LoadError::with_source("cannot read scaffold", io);
        assert!(err.source().is_some());
    }
}
