//! The embedding map: fitted-space points to host material coordinates.

use embed_types::{CoordinateField, Element, MeshLocation, Point3};
use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::domain::FittedDomain;
use crate::error::{LocateError, LocateResult};
use crate::params::ResolverParams;
use crate::search::SearchMesh;

/// A resolved point: its host location and the material coordinates there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Embedding {
    /// Location in the host mesh.
    pub location: MeshLocation,
    /// Material coordinates evaluated at the location.
    pub material: Point3<f64>,
}

/// A map from fitted-space points to host material space.
pub trait EmbeddingMap {
    /// Find the host location of a fitted-space point.
    fn locate(&self, point: &Point3<f64>) -> Option<MeshLocation>;

    /// Evaluate material coordinates at a host location.
    fn material_at(&self, location: &MeshLocation) -> Option<Point3<f64>>;

    /// Number of components of the material coordinates.
    fn material_components(&self) -> usize;

    /// Locate a point and evaluate its material coordinates.
    fn embed(&self, point: &Point3<f64>) -> Option<Embedding> {
        let location = self.locate(point)?;
        let material = self.material_at(&location)?;
        Some(Embedding { location, material })
    }

    /// Embed a batch of points. Results are in input order.
    fn embed_all(&self, points: &[Point3<f64>]) -> Vec<Option<Embedding>> {
        points.iter().map(|point| self.embed(point)).collect()
    }
}

/// Resolves fitted-space points by mesh location search.
///
/// For volumetric domains the search is two-tier: an exact search inside the
/// domain elements, then a nearest search over the domain's exterior boundary
/// for points the exact search misses. Other domains use a single nearest
/// search over their elements.
///
/// # Example
///
/// ```
/// use embed_locate::{EmbeddingMap, FittedDomain, LocationResolver, ResolverParams};
/// use embed_types::{CoordinateField, Element, ElementShape, Model, PointKey, Point3};
///
/// // A line from x=0 to x=2 in fitted space, parameterized 0..1 in material space.
/// let mut host = Model::new();
/// host.add_nodes([1, 2]);
/// host.add_element(Element::new(1, ElementShape::Line, vec![1, 2]).unwrap()).unwrap();
/// let mut fitted = CoordinateField::new("fitted coordinates", 3).unwrap();
/// fitted.set_point(PointKey::Node(1), Point3::new(0.0, 0.0, 0.0));
/// fitted.set_point(PointKey::Node(2), Point3::new(2.0, 0.0, 0.0));
/// let mut material = CoordinateField::new("body coordinates", 1).unwrap();
/// material.set_value(PointKey::Node(1), &[0.0]).unwrap();
/// material.set_value(PointKey::Node(2), &[1.0]).unwrap();
///
/// let domain = FittedDomain::new(&host, &fitted, None).unwrap();
/// let resolver = LocationResolver::new(&domain, &fitted, &material, ResolverParams::default()).unwrap();
///
/// let embedding = resolver.embed(&Point3::new(0.5, 1.0, 0.0)).unwrap();
/// assert!((embedding.material.x - 0.25).abs() < 1e-9);
/// ```
pub struct LocationResolver {
    dimension: usize,
    interior: SearchMesh,
    boundary: Option<SearchMesh>,
    elements: HashMap<u32, Element>,
    material: CoordinateField,
    params: ResolverParams,
}

impl LocationResolver {
    /// Build a resolver over a fitted domain.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::ComponentMismatch`] if the domain is a volume and
    /// the fitted field has fewer than three components.
    pub fn new(
        domain: &FittedDomain,
        fitted: &CoordinateField,
        material: &CoordinateField,
        params: ResolverParams,
    ) -> LocateResult<Self> {
        if domain.is_volume() && fitted.components() < domain.dimension() {
            return Err(LocateError::ComponentMismatch {
                field: fitted.name().to_string(),
                components: fitted.components(),
                dimension: domain.dimension(),
            });
        }

        let interior = SearchMesh::from_elements(domain.elements(), fitted);
        let boundary = domain
            .is_volume()
            .then(|| SearchMesh::from_boundary(domain.elements(), domain.boundary(), fitted));
        let elements = domain
            .elements()
            .iter()
            .map(|element| (element.id, element.clone()))
            .collect();

        debug!(
            dimension = domain.dimension(),
            interior_cells = interior.len(),
            boundary_cells = boundary.as_ref().map_or(0, SearchMesh::len),
            material = material.name(),
            "Built location resolver"
        );

        Ok(Self {
            dimension: domain.dimension(),
            interior,
            boundary,
            elements,
            material: material.clone(),
            params,
        })
    }

    /// Dimension of the search elements.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the material coordinates field evaluated at locations.
    #[must_use]
    pub fn material_field_name(&self) -> &str {
        self.material.name()
    }

    /// Resolver parameters.
    #[must_use]
    pub const fn params(&self) -> &ResolverParams {
        &self.params
    }
}

impl EmbeddingMap for LocationResolver {
    fn locate(&self, point: &Point3<f64>) -> Option<MeshLocation> {
        let Some(boundary) = &self.boundary else {
            return self
                .interior
                .nearest(point, &self.params)
                .map(|hit| hit.location);
        };

        if let Some(hit) = self.interior.exact(point, &self.params) {
            return Some(hit.location);
        }
        let fallback = if boundary.is_empty() {
            &self.interior
        } else {
            boundary
        };
        let hit = fallback.nearest(point, &self.params)?;
        trace!(
            x = point.x,
            y = point.y,
            z = point.z,
            distance = hit.distance_squared.sqrt(),
            element = hit.location.element,
            "Point outside fitted domain projected onto boundary"
        );
        Some(hit.location)
    }

    fn material_at(&self, location: &MeshLocation) -> Option<Point3<f64>> {
        let element = self.elements.get(&location.element)?;
        self.material.evaluate(element, &location.xi)
    }

    fn material_components(&self) -> usize {
        self.material.components()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::two_cube_host;
    use approx::assert_relative_eq;
    use embed_types::Model;

    /// Fitted geometry is the material cubes scaled by 2 and shifted by (1, 0, 0).
    fn scaled(p: Point3<f64>) -> Point3<f64> {
        Point3::new(2.0 * p.x + 1.0, 2.0 * p.y, 2.0 * p.z)
    }

    fn resolver_for(host: &Model, group: Option<&str>) -> LocationResolver {
        let fitted = host.fields().coordinates("fitted coordinates").unwrap();
        let material = host.fields().coordinates("body coordinates").unwrap();
        let domain = FittedDomain::new(host, fitted, group.and_then(|g| host.group(g))).unwrap();
        LocationResolver::new(&domain, fitted, material, ResolverParams::default()).unwrap()
    }

    #[test]
    fn test_interior_point_inverts_deformation() {
        let host = two_cube_host(scaled);
        let resolver = resolver_for(&host, None);
        let embedding = resolver.embed(&scaled(Point3::new(1.25, 0.5, 0.75))).unwrap();
        assert_eq!(embedding.location.element, 2);
        assert_relative_eq!(embedding.material, Point3::new(1.25, 0.5, 0.75), epsilon = 1e-8);
    }

    #[test]
    fn test_outside_point_projects_onto_boundary() {
        let host = two_cube_host(scaled);
        let resolver = resolver_for(&host, None);
        // Fitted domain spans x in [1, 5]; this point is 0.5 beyond the low-x face.
        let embedding = resolver.embed(&Point3::new(0.5, 1.0, 0.5)).unwrap();
        assert_eq!(embedding.location.element, 1);
        assert_relative_eq!(embedding.material, Point3::new(0.0, 0.5, 0.25), epsilon = 1e-8);
    }

    #[test]
    fn test_outside_corner_projects_onto_corner() {
        let host = two_cube_host(scaled);
        let resolver = resolver_for(&host, None);
        let embedding = resolver.embed(&Point3::new(6.0, 3.0, -1.0)).unwrap();
        assert_relative_eq!(embedding.material, Point3::new(2.0, 1.0, 0.0), epsilon = 1e-8);
    }

    #[test]
    fn test_projection_group_forces_points_onto_surface() {
        let host = two_cube_host(scaled);
        let resolver = resolver_for(&host, Some("bottom"));
        assert_eq!(resolver.dimension(), 2);
        // An interior point lands on the bottom surface directly beneath it.
        let embedding = resolver.embed(&scaled(Point3::new(0.5, 0.5, 0.5))).unwrap();
        assert_relative_eq!(embedding.material, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-8);
    }

    #[test]
    fn test_embed_all_preserves_order() {
        let host = two_cube_host(scaled);
        let resolver = resolver_for(&host, None);
        let points = [scaled(Point3::new(0.5, 0.5, 0.5)), scaled(Point3::new(1.5, 0.5, 0.5))];
        let embeddings = resolver.embed_all(&points);
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].map(|e| e.location.element), Some(1));
        assert_eq!(embeddings[1].map(|e| e.location.element), Some(2));
    }

    #[test]
    fn test_two_component_fitted_field_rejected_for_volume() {
        let host = two_cube_host(scaled);
        let fitted3 = host.fields().coordinates("fitted coordinates").unwrap();
        let material = host.fields().coordinates("body coordinates").unwrap();
        let domain = FittedDomain::new(&host, fitted3, None).unwrap();
        let fitted2 = CoordinateField::new("flat", 2).unwrap();
        let result = LocationResolver::new(&domain, &fitted2, material, ResolverParams::default());
        assert!(matches!(result, Err(LocateError::ComponentMismatch { components: 2, .. })));
    }

    #[test]
    fn test_material_undefined_yields_no_embedding() {
        let host = two_cube_host(scaled);
        let fitted = host.fields().coordinates("fitted coordinates").unwrap();
        let domain = FittedDomain::new(&host, fitted, None).unwrap();
        let material = CoordinateField::new("empty", 3).unwrap();
        let resolver =
            LocationResolver::new(&domain, fitted, &material, ResolverParams::default()).unwrap();
        let point = scaled(Point3::new(0.5, 0.5, 0.5));
        assert!(resolver.locate(&point).is_some());
        assert!(resolver.embed(&point).is_none());
    }
}
