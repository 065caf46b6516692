//! Core model types for embedding data in a host mesh.
//!
//! This crate provides the data model shared by the location, classification
//! and assembly crates:
//!
//! - [`ElementShape`] and [`Element`] - linear Lagrange elements with basis functions
//! - [`ElementSet`] - the elements of one dimension
//! - [`CoordinateField`], [`StringField`], [`MeshLocationField`] - the field kinds,
//!   unified by [`Field`] and collected in a [`FieldSet`]
//! - [`Group`] - a named subset of elements and points
//! - [`Model`] - nodes, datapoints, elements, fields and groups together
//! - [`Aabb`] - axis-aligned bounding box used for search pruning
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no rendering or file-format dependencies.
//! Models are built in memory by whatever loader the caller uses.
//!
//! # Example
//!
//! ```
//! use embed_types::{CoordinateField, Element, ElementShape, Model, PointKey, Point3, Xi};
//!
//! let mut model = Model::new();
//! model.add_nodes([1, 2]);
//! let line = Element::new(1, ElementShape::Line, vec![1, 2]).unwrap();
//! model.add_element(line.clone()).unwrap();
//!
//! let mut coordinates = CoordinateField::new("coordinates", 3).unwrap();
//! coordinates.set_point(PointKey::Node(1), Point3::new(0.0, 0.0, 0.0));
//! coordinates.set_point(PointKey::Node(2), Point3::new(2.0, 0.0, 0.0));
//!
//! let mid = coordinates.evaluate(&line, &Xi::new(0.5, 0.0, 0.0)).unwrap();
//! assert!((mid.x - 1.0).abs() < 1e-12);
//! model.fields_mut().add(coordinates).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod element;
mod error;
mod field;
mod group;
mod model;

pub use bounds::Aabb;
pub use element::{
    BasisDerivatives, BasisValues, Element, ElementSet, ElementShape, Facet, MAX_ELEMENT_NODES,
    MeshLocation, Xi,
};
pub use error::{TypesError, TypesResult};
pub use field::{
    CoordinateField, Field, FieldSet, MeshLocationField, PointKey, StringField, interpolate,
};
pub use group::Group;
pub use model::Model;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
