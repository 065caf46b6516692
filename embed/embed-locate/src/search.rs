//! Spatial search over a set of cells.
//!
//! A cell is a domain element, or a boundary facet of one, together with its
//! fitted node values and bounding box. Two k-d trees serve the queries: one
//! over cell node values seeds nearest queries with an upper bound, and one
//! over cell box centres gathers the cells that can contain or beat a point.
//! Only those cells are inverted or projected.

use embed_types::{Aabb, CoordinateField, Element, ElementShape, Facet, MeshLocation, Point3, Xi};
use kiddo::{ImmutableKdTree, SquaredEuclidean};

use crate::domain::BoundaryFacet;
use crate::params::ResolverParams;
use crate::solve::{invert, project};

/// Relative and absolute widening of centre-tree query radii.
const RADIUS_SLACK: f64 = 1e-9;

#[derive(Debug, Clone)]
struct SearchCell {
    element: u32,
    parent: ElementShape,
    facet: Option<Facet>,
    shape: ElementShape,
    values: Vec<Point3<f64>>,
    bounds: Aabb,
}

impl SearchCell {
    fn new(element: &Element, facet: Option<Facet>, field: &CoordinateField) -> Option<Self> {
        let all_values = field.element_values(element)?;
        let (shape, values) = match facet {
            Some(facet) => (
                element.shape.facet_shape()?,
                facet.nodes.iter().map(|&local| all_values[local]).collect(),
            ),
            None => (element.shape, all_values),
        };
        let bounds = Aabb::from_points(&values);
        Some(Self {
            element: element.id,
            parent: element.shape,
            facet,
            shape,
            values,
            bounds,
        })
    }

    fn location(&self, xi: &Xi) -> MeshLocation {
        let xi = match &self.facet {
            Some(facet) => facet.element_xi(xi, self.parent),
            None => *xi,
        };
        MeshLocation {
            dimension: self.parent.dimension(),
            element: self.element,
            xi,
        }
    }
}

/// Result of a search: a location and its squared distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hit {
    pub location: MeshLocation,
    pub distance_squared: f64,
}

/// A searchable set of cells.
pub(crate) struct SearchMesh {
    cells: Vec<SearchCell>,
    tree: Option<ImmutableKdTree<f64, 3>>,
    /// `(cell, local node)` for each node tree entry, in insertion order.
    tree_items: Vec<(usize, usize)>,
    /// Box centres, one entry per cell in cell order.
    centres: Option<ImmutableKdTree<f64, 3>>,
    /// Largest half-diagonal over all cell boxes.
    reach: f64,
}

impl SearchMesh {
    /// Cells for whole elements.
    pub(crate) fn from_elements(elements: &[Element], field: &CoordinateField) -> Self {
        let cells = elements
            .iter()
            .filter_map(|element| SearchCell::new(element, None, field))
            .collect();
        Self::from_cells(cells)
    }

    /// Cells for boundary facets of elements.
    pub(crate) fn from_boundary(
        elements: &[Element],
        boundary: &[BoundaryFacet],
        field: &CoordinateField,
    ) -> Self {
        let cells = boundary
            .iter()
            .filter_map(|b| {
                let element = elements.iter().find(|e| e.id == b.element)?;
                SearchCell::new(element, Some(b.facet), field)
            })
            .collect();
        Self::from_cells(cells)
    }

    fn from_cells(cells: Vec<SearchCell>) -> Self {
        let mut points = Vec::new();
        let mut tree_items = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            for (local, value) in cell.values.iter().enumerate() {
                points.push([value.x, value.y, value.z]);
                tree_items.push((index, local));
            }
        }
        let tree = (!points.is_empty()).then(|| ImmutableKdTree::new_from_slice(&points));

        let centres: Vec<[f64; 3]> = cells
            .iter()
            .map(|cell| {
                let c = cell.bounds.center();
                [c.x, c.y, c.z]
            })
            .collect();
        let centres = (!centres.is_empty()).then(|| ImmutableKdTree::new_from_slice(&centres));
        let reach = cells
            .iter()
            .map(|cell| 0.5 * cell.bounds.diagonal())
            .fold(0.0, f64::max);

        Self {
            cells,
            tree,
            tree_items,
            centres,
            reach,
        }
    }

    /// Indices of cells whose box centre is within `radius` of `target`, in
    /// cell order. Every box within `radius - reach` of `target` is included.
    fn cells_near(&self, target: &Point3<f64>, radius: f64) -> Vec<usize> {
        let Some(centres) = &self.centres else {
            return Vec::new();
        };
        // Slack keeps boxes exactly at the radius.
        let radius = radius * (1.0 + RADIUS_SLACK) + RADIUS_SLACK;
        let mut indices: Vec<usize> = centres
            .within_unsorted::<SquaredEuclidean>(&[target.x, target.y, target.z], radius * radius)
            .into_iter()
            .filter_map(|neighbour| usize::try_from(neighbour.item).ok())
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Number of cells.
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if there are no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell containing `target` exactly, in cell order.
    pub(crate) fn exact(&self, target: &Point3<f64>, params: &ResolverParams) -> Option<Hit> {
        // An inflated box grows its half-diagonal by at most sqrt(3) * margin.
        let radius = self.reach * (1.0 + 4.0 * params.tolerance);
        self.cells_near(target, radius).into_iter().find_map(|index| {
            let cell = &self.cells[index];
            let margin = params.tolerance * cell.bounds.diagonal();
            if !cell.bounds.inflated(margin).contains(target) {
                return None;
            }
            let xi = invert(
                cell.shape,
                &cell.values,
                target,
                params.tolerance,
                params.max_iterations,
            )?;
            Some(Hit {
                location: cell.location(&xi),
                distance_squared: 0.0,
            })
        })
    }

    /// Location nearest to `target` over all cells.
    pub(crate) fn nearest(&self, target: &Point3<f64>, params: &ResolverParams) -> Option<Hit> {
        let tree = self.tree.as_ref()?;
        let seed = tree.nearest_one::<SquaredEuclidean>(&[target.x, target.y, target.z]);
        let &(seed_cell, seed_node) = self.tree_items.get(usize::try_from(seed.item).ok()?)?;
        let seed_shape = self.cells[seed_cell].shape;

        let mut best_cell = seed_cell;
        let mut best_xi = seed_shape.node_xi(seed_node);
        let mut best_distance = seed.distance;

        let mut candidates: Vec<(f64, usize)> = self
            .cells_near(target, best_distance.sqrt() + self.reach)
            .into_iter()
            .map(|index| (self.cells[index].bounds.distance_squared_to(target), index))
            .filter(|(lower_bound, _)| *lower_bound <= best_distance)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (lower_bound, index) in candidates {
            if lower_bound > best_distance {
                break;
            }
            let cell = &self.cells[index];
            let (xi, distance) = project(cell.shape, &cell.values, target, params.max_iterations);
            if distance < best_distance {
                best_cell = index;
                best_xi = xi;
                best_distance = distance;
            }
        }

        Some(Hit {
            location: self.cells[best_cell].location(&best_xi),
            distance_squared: best_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FittedDomain;
    use crate::test_support::two_cube_host;
    use approx::assert_relative_eq;

    fn two_cube_meshes() -> (SearchMesh, SearchMesh) {
        let host = two_cube_host(|p| p);
        let fitted = host.fields().coordinates("fitted coordinates").unwrap();
        let domain = FittedDomain::new(&host, fitted, None).unwrap();
        (
            SearchMesh::from_elements(domain.elements(), fitted),
            SearchMesh::from_boundary(domain.elements(), domain.boundary(), fitted),
        )
    }

    #[test]
    fn test_cell_counts() {
        let (interior, boundary) = two_cube_meshes();
        assert_eq!(interior.len(), 2);
        assert_eq!(boundary.len(), 10);
        assert!(!boundary.is_empty());
    }

    #[test]
    fn test_exact_finds_second_cube() {
        let (interior, _) = two_cube_meshes();
        let hit = interior
            .exact(&Point3::new(1.5, 0.25, 0.75), &ResolverParams::default())
            .unwrap();
        assert_eq!(hit.location.element, 2);
        assert_relative_eq!(hit.location.xi, Xi::new(0.5, 0.25, 0.75), epsilon = 1e-8);
    }

    #[test]
    fn test_centre_tree_gathers_nearby_cells() {
        let (interior, _) = two_cube_meshes();
        let reach = 0.5 * 3.0_f64.sqrt();
        assert_relative_eq!(interior.reach, reach, epsilon = 1e-12);
        // Centres are at x = 0.5 and x = 1.5; only the second is within reach.
        assert_eq!(interior.cells_near(&Point3::new(1.9, 0.5, 0.5), reach), [1]);
        assert_eq!(interior.cells_near(&Point3::new(1.0, 0.5, 0.5), reach), [0, 1]);
        assert!(interior.cells_near(&Point3::new(10.0, 10.0, 10.0), reach).is_empty());
    }

    #[test]
    fn test_exact_misses_outside() {
        let (interior, _) = two_cube_meshes();
        assert!(
            interior
                .exact(&Point3::new(2.5, 0.5, 0.5), &ResolverParams::default())
                .is_none()
        );
    }

    #[test]
    fn test_nearest_on_boundary_maps_to_parent_element() {
        let (_, boundary) = two_cube_meshes();
        let hit = boundary
            .nearest(&Point3::new(2.5, 0.5, 0.25), &ResolverParams::default())
            .unwrap();
        assert_eq!(hit.location.dimension, 3);
        assert_eq!(hit.location.element, 2);
        assert_relative_eq!(hit.location.xi, Xi::new(1.0, 0.5, 0.25), epsilon = 1e-10);
        assert_relative_eq!(hit.distance_squared, 0.25, epsilon = 1e-10);
    }

    #[test]
    fn test_empty_mesh_finds_nothing() {
        let empty = SearchMesh::from_cells(Vec::new());
        assert!(empty.nearest(&Point3::origin(), &ResolverParams::default()).is_none());
    }
}
