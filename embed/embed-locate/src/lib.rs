//! Mesh location search for embedding fitted-space data in a host mesh.
//!
//! Given a host model with a *fitted* coordinates field (the host's shape in
//! the dataset's space) and a *material* coordinates field (the canonical
//! reference parameterization), this crate maps any fitted-space point to the
//! host location whose fitted value equals, or is nearest to, the point, and
//! evaluates material coordinates there.
//!
//! # Search Strategy
//!
//! | Host dimension | Search |
//! |----------------|--------|
//! | 1 or 2 | Nearest location over the domain elements |
//! | 3 | Exact location inside the volume, else nearest on its exterior boundary |
//!
//! Exact nearest search directly against a volume is unreliable near internal
//! element boundaries, so volumes fall back to their boundary surface for
//! points outside the fitted domain.
//!
//! A projection group restricts the domain to one subregion of the host,
//! forcing every resolved point onto it.
//!
//! # Example
//!
//! ```
//! use embed_locate::{EmbeddingMap, FittedDomain, LocationResolver, ResolverParams};
//! # use embed_types::{CoordinateField, Element, ElementShape, Model, PointKey, Point3};
//! # let mut host = Model::new();
//! # host.add_nodes([1, 2, 3, 4]);
//! # host.add_element(Element::new(1, ElementShape::Square, vec![1, 2, 3, 4]).unwrap()).unwrap();
//! # let mut fitted = CoordinateField::new("fitted coordinates", 3).unwrap();
//! # let mut material = CoordinateField::new("material coordinates", 2).unwrap();
//! # for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].into_iter().enumerate() {
//! #     let key = PointKey::Node(i as u32 + 1);
//! #     fitted.set_point(key, Point3::new(3.0 * x, 3.0 * y, 0.0));
//! #     material.set_value(key, &[x, y]).unwrap();
//! # }
//! let domain = FittedDomain::new(&host, &fitted, None).unwrap();
//! let resolver = LocationResolver::new(&domain, &fitted, &material, ResolverParams::default()).unwrap();
//! let embedding = resolver.embed(&Point3::new(1.5, 1.5, 0.7)).unwrap();
//! assert!((embedding.material.x - 0.5).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod domain;
mod error;
mod params;
mod resolver;
mod search;
mod solve;

pub use domain::{BoundaryFacet, FittedDomain};
pub use error::{LocateError, LocateResult};
pub use params::ResolverParams;
pub use resolver::{Embedding, EmbeddingMap, LocationResolver};

#[cfg(test)]
pub(crate) mod test_support {
    use embed_types::{CoordinateField, Element, ElementShape, Group, Model, Point3, PointKey};

    /// Node identifier of grid corner `(i, j, k)` on the 3x2x2 node grid.
    pub fn node_id(i: u32, j: u32, k: u32) -> u32 {
        1 + i + 3 * j + 6 * k
    }

    /// Two unit cubes sharing the face x=1, with material coordinates equal to
    /// grid positions and fitted coordinates given by `deform`.
    ///
    /// Groups: `body` (both cubes) and `bottom` (the two z=0 faces).
    pub fn two_cube_host(deform: impl Fn(Point3<f64>) -> Point3<f64>) -> Model {
        let mut model = Model::new();
        let mut material = CoordinateField::new("body coordinates", 3).unwrap();
        let mut fitted = CoordinateField::new("fitted coordinates", 3).unwrap();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..3 {
                    let id = node_id(i, j, k);
                    let position = Point3::new(f64::from(i), f64::from(j), f64::from(k));
                    model.add_node(id);
                    material.set_point(PointKey::Node(id), position);
                    fitted.set_point(PointKey::Node(id), deform(position));
                }
            }
        }
        for cube in 0..2 {
            let nodes: Vec<u32> = (0..8)
                .map(|local| node_id(cube + (local & 1), (local >> 1) & 1, (local >> 2) & 1))
                .collect();
            model
                .add_element(Element::new(cube + 1, ElementShape::Cube, nodes).unwrap())
                .unwrap();
            let face = vec![
                node_id(cube, 0, 0),
                node_id(cube + 1, 0, 0),
                node_id(cube, 1, 0),
                node_id(cube + 1, 1, 0),
            ];
            model
                .add_element(Element::new(cube + 1, ElementShape::Square, face).unwrap())
                .unwrap();
        }

        let mut body = Group::new("body");
        body.add_elements(3, [1, 2]);
        model.add_group(body).unwrap();
        let mut bottom = Group::new("bottom");
        bottom.add_elements(2, [1, 2]);
        model.add_group(bottom).unwrap();

        model.fields_mut().add(fitted).unwrap();
        model.fields_mut().add(material).unwrap();
        model
    }
}
