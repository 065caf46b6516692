//! Embed datasets captured on a fitted shape into a host's material coordinates.
//!
//! Scientific data is often digitized against a subject-specific *fitted*
//! geometry. This crate re-expresses such data in the *material* coordinates
//! of a host scaffold sharing the fitted geometry's topology, making datasets
//! from different subjects comparable.
//!
//! # Crates
//!
//! | Module | Crate | Role |
//! |--------|-------|------|
//! | [`types`] | `embed-types` | Elements, fields, groups and models |
//! | [`locate`] | `embed-locate` | Fitted-space to material-space location search |
//! | [`classify`] | `embed-classify` | Group dimensions, sizes and embed decisions |
//! | [`assemble`] | `embed-assemble` | Filtered output with material coordinates |
//!
//! This crate adds the [`DataEmbedder`] engine tying them together, the
//! [`ModelSource`] loader boundary, the [`FieldResolver`] strategy for
//! finding coordinate fields, and JSON [`EmbedderSettings`].
//!
//! # Example
//!
//! ```no_run
//! use embedder::prelude::*;
//! # let (scaffold, fitted, data) = (Model::new(), Model::new(), Model::new());
//!
//! let source = InMemorySource::new()
//!     .with_scaffold(scaffold)
//!     .with_fitted_geometry(fitted)
//!     .with_data(data);
//! let mut embedder = DataEmbedder::new(source);
//! embedder.decode_settings_json(r#"{"dataMarkerGroup": "fiducials"}"#)?;
//! embedder.load()?;
//!
//! for name in embedder.group_names() {
//!     println!("{name}: dimension {}", embedder.group_dimension(name));
//! }
//! let output = embedder.generate_output()?;
//! let material = output.material_coordinates();
//! # Ok::<(), EmbedderError>(())
//! ```
//!
//! # Logging
//!
//! Components log through `tracing` at `debug` level. The engine reports
//! degraded conditions (missing fields, unknown groups, renamed output
//! fields) as warnings when the diagnostic level is above 0. No subscriber
//! is installed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod engine;
mod error;
mod resolver;
mod settings;
mod source;

pub use engine::{DataEmbedder, EmbedderState, FITTED_PREFIX};
pub use error::{EmbedderError, EmbedderResult};
pub use resolver::{ConventionFieldResolver, FieldResolver};
pub use settings::{EmbedderSettings, GroupSettings};
pub use source::{InMemorySource, LoadError, ModelInput, ModelSource};

// =============================================================================
// Re-exports
// =============================================================================

/// Elements, fields, groups and models.
pub use embed_types as types;

/// Location search from fitted space to material space.
pub use embed_locate as locate;

/// Group classification.
pub use embed_classify as classify;

/// Output assembly.
pub use embed_assemble as assemble;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for embedding runs.
///
/// ```
/// use embedder::prelude::*;
/// ```
pub mod prelude {
    // Engine
    pub use crate::{
        ConventionFieldResolver, DataEmbedder, EmbedderError, EmbedderSettings, EmbedderState,
        FieldResolver, InMemorySource, ModelInput, ModelSource,
    };

    // Data model
    pub use embed_types::{
        CoordinateField, Element, ElementShape, Group, MeshLocation, Model, Point3, PointKey,
        StringField,
    };

    // Components
    pub use embed_assemble::{AssemblyReport, OutputDataSet};
    pub use embed_classify::{GroupRecord, GroupTable};
    pub use embed_locate::{EmbeddingMap, LocationResolver, ResolverParams};
}
