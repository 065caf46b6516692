//! The fitted domain: host elements the fitted field is defined on.

use embed_types::{CoordinateField, Element, Facet, Group, Model};
use hashbrown::HashMap;
use tracing::debug;

use crate::error::{LocateError, LocateResult};

/// A facet of a domain element lying on the domain's exterior boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFacet {
    /// Identifier of the parent element.
    pub element: u32,
    /// The facet of the parent element.
    pub facet: Facet,
}

/// The search elements of a host model.
///
/// Without a projection group this is every host element of the highest
/// dimension on which the fitted field is defined. With one, it is the group's
/// elements at the group's highest dimension, still restricted to where the
/// fitted field is defined. For volumes the exterior boundary is every facet
/// belonging to exactly one domain element.
///
/// Rebuilt whenever the host, fitted field or projection group changes.
#[derive(Debug, Clone)]
pub struct FittedDomain {
    dimension: usize,
    elements: Vec<Element>,
    boundary: Vec<BoundaryFacet>,
}

impl FittedDomain {
    /// Derive the fitted domain of `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or projection group has no elements, or if
    /// the fitted field is defined on none of the candidate elements.
    pub fn new(
        host: &Model,
        fitted: &CoordinateField,
        projection_group: Option<&Group>,
    ) -> LocateResult<Self> {
        let host_dimension = host.highest_dimension();
        if host_dimension == 0 {
            return Err(LocateError::EmptyHost);
        }

        let (dimension, candidates): (usize, Vec<&Element>) = match projection_group {
            Some(group) => {
                let dimension = group.highest_dimension().ok_or_else(|| {
                    LocateError::EmptyProjectionGroup {
                        name: group.name().to_string(),
                    }
                })?;
                let candidates = group
                    .elements(dimension)
                    .filter_map(|id| host.element(dimension, id))
                    .collect();
                (dimension, candidates)
            }
            None => {
                let candidates = host
                    .mesh(host_dimension)
                    .map(|mesh| mesh.iter().collect())
                    .unwrap_or_default();
                (host_dimension, candidates)
            }
        };

        let elements: Vec<Element> = candidates
            .into_iter()
            .filter(|element| fitted.is_defined_on(element))
            .cloned()
            .collect();
        if elements.is_empty() {
            return Err(LocateError::EmptyFittedDomain {
                field: fitted.name().to_string(),
                dimension,
            });
        }

        let boundary = if dimension == 3 {
            exterior_facets(&elements)
        } else {
            Vec::new()
        };

        debug!(
            dimension,
            elements = elements.len(),
            boundary_facets = boundary.len(),
            projection_group = ?projection_group.map(Group::name),
            "Built fitted domain"
        );

        Ok(Self {
            dimension,
            elements,
            boundary,
        })
    }

    /// Dimension of the search elements.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Search elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Exterior boundary facets; empty unless the domain is a volume.
    #[must_use]
    pub fn boundary(&self) -> &[BoundaryFacet] {
        &self.boundary
    }

    /// Check whether the domain is a volume and uses the two-tier search.
    #[must_use]
    pub const fn is_volume(&self) -> bool {
        self.dimension == 3
    }
}

/// Facets that belong to exactly one element, in element order.
fn exterior_facets(elements: &[Element]) -> Vec<BoundaryFacet> {
    let key = |element: &Element, facet: &Facet| {
        let mut nodes = element.facet_nodes(facet);
        nodes.sort_unstable();
        nodes
    };

    let mut counts: HashMap<Vec<u32>, usize> = HashMap::new();
    for element in elements {
        for facet in element.shape.facets() {
            *counts.entry(key(element, facet)).or_insert(0) += 1;
        }
    }

    elements
        .iter()
        .flat_map(|element| {
            element
                .shape
                .facets()
                .iter()
                .filter(|facet| counts.get(&key(element, facet)) == Some(&1))
                .map(|facet| BoundaryFacet {
                    element: element.id,
                    facet: *facet,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
