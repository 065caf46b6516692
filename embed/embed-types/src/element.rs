//! Element shapes, basis functions and element sets.
//!
//! Elements are linear Lagrange cells on the unit reference cube `[0,1]^d`.
//! Local nodes are numbered `i + 2j + 4k` with `xi1` varying fastest, so the
//! bits of a local node index give its corner in reference space.

use hashbrown::HashMap;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};

/// Element-local (reference) coordinates. Components beyond the element
/// dimension are zero.
pub type Xi = Vector3<f64>;

/// Maximum number of nodes on any supported element.
pub const MAX_ELEMENT_NODES: usize = 8;

/// Basis function values, one per local node. Entries past
/// [`ElementShape::node_count`] are zero.
pub type BasisValues = [f64; MAX_ELEMENT_NODES];

/// Basis derivatives `dN/dxi_k`, one row per local node.
pub type BasisDerivatives = [[f64; 3]; MAX_ELEMENT_NODES];

/// Shape of a linear Lagrange element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementShape {
    /// 2-node line on `[0,1]`.
    Line,
    /// 4-node bilinear square on `[0,1]^2`.
    Square,
    /// 8-node trilinear cube on `[0,1]^3`.
    Cube,
}

/// A `d-1` dimensional face of an element: the nodes lying on
/// `xi[axis] == value`, listed in facet-local order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facet {
    /// Reference axis held fixed on this facet.
    pub axis: usize,
    /// Value of the fixed axis, 0 or 1.
    pub value: u8,
    /// Local node indices of the parent element, in facet-local order.
    pub nodes: &'static [usize],
}

const SQUARE_FACETS: [Facet; 4] = [
    Facet { axis: 0, value: 0, nodes: &[0, 2] },
    Facet { axis: 0, value: 1, nodes: &[1, 3] },
    Facet { axis: 1, value: 0, nodes: &[0, 1] },
    Facet { axis: 1, value: 1, nodes: &[2, 3] },
];

const CUBE_FACETS: [Facet; 6] = [
    Facet { axis: 0, value: 0, nodes: &[0, 2, 4, 6] },
    Facet { axis: 0, value: 1, nodes: &[1, 3, 5, 7] },
    Facet { axis: 1, value: 0, nodes: &[0, 1, 4, 5] },
    Facet { axis: 1, value: 1, nodes: &[2, 3, 6, 7] },
    Facet { axis: 2, value: 0, nodes: &[0, 1, 2, 3] },
    Facet { axis: 2, value: 1, nodes: &[4, 5, 6, 7] },
];

impl Facet {
    /// Map facet-local coordinates onto the parent element's reference cell.
    ///
    /// The free parent axes are filled in increasing order from `facet_xi`.
    #[must_use]
    pub fn element_xi(&self, facet_xi: &Xi, parent: ElementShape) -> Xi {
        let mut xi = Xi::zeros();
        let mut next = 0;
        for axis in 0..parent.dimension() {
            if axis == self.axis {
                xi[axis] = f64::from(self.value);
            } else {
                xi[axis] = facet_xi[next];
                next += 1;
            }
        }
        xi
    }
}

impl ElementShape {
    /// Shape for a given dimension, if supported.
    #[must_use]
    pub const fn from_dimension(dimension: usize) -> Option<Self> {
        match dimension {
            1 => Some(Self::Line),
            2 => Some(Self::Square),
            3 => Some(Self::Cube),
            _ => None,
        }
    }

    /// Topological dimension of the shape.
    #[must_use]
    pub const fn dimension(self) -> usize {
        match self {
            Self::Line => 1,
            Self::Square => 2,
            Self::Cube => 3,
        }
    }

    /// Number of local nodes.
    #[must_use]
    pub const fn node_count(self) -> usize {
        1 << self.dimension()
    }

    /// Reference-cell centre.
    #[must_use]
    pub fn centre(self) -> Xi {
        let mut xi = Xi::zeros();
        for axis in 0..self.dimension() {
            xi[axis] = 0.5;
        }
        xi
    }

    /// Clamp `xi` into the reference cell.
    #[must_use]
    pub fn clamp(self, xi: &Xi) -> Xi {
        let mut clamped = Xi::zeros();
        for axis in 0..self.dimension() {
            clamped[axis] = xi[axis].clamp(0.0, 1.0);
        }
        clamped
    }

    /// Check that `xi` lies in the reference cell, allowing `tolerance` outside.
    #[must_use]
    pub fn contains_xi(self, xi: &Xi, tolerance: f64) -> bool {
        (0..self.dimension()).all(|axis| xi[axis] >= -tolerance && xi[axis] <= 1.0 + tolerance)
    }

    /// Facets of this shape; empty for lines.
    #[must_use]
    pub fn facets(self) -> &'static [Facet] {
        match self {
            Self::Line => &[],
            Self::Square => &SQUARE_FACETS,
            Self::Cube => &CUBE_FACETS,
        }
    }

    /// Shape of this shape's facets.
    #[must_use]
    pub const fn facet_shape(self) -> Option<Self> {
        Self::from_dimension(self.dimension() - 1)
    }

    /// Evaluate the basis functions at `xi`.
    #[must_use]
    pub fn basis(self, xi: &Xi) -> BasisValues {
        let mut values = [0.0; MAX_ELEMENT_NODES];
        for (node, value) in values.iter_mut().enumerate().take(self.node_count()) {
            *value = (0..self.dimension())
                .map(|axis| linear(node_bit(node, axis), xi[axis]))
                .product();
        }
        values
    }

    /// Evaluate the basis derivatives at `xi`.
    #[must_use]
    pub fn basis_derivatives(self, xi: &Xi) -> BasisDerivatives {
        let dimension = self.dimension();
        let mut derivatives = [[0.0; 3]; MAX_ELEMENT_NODES];
        for (node, row) in derivatives.iter_mut().enumerate().take(self.node_count()) {
            for (axis, slot) in row.iter_mut().enumerate().take(dimension) {
                let mut product = if node_bit(node, axis) { 1.0 } else { -1.0 };
                for other in (0..dimension).filter(|&other| other != axis) {
                    product *= linear(node_bit(node, other), xi[other]);
                }
                *slot = product;
            }
        }
        derivatives
    }

    /// Reference coordinates of a local node.
    #[must_use]
    pub fn node_xi(self, node: usize) -> Xi {
        let mut xi = Xi::zeros();
        for axis in 0..self.dimension() {
            if node_bit(node, axis) {
                xi[axis] = 1.0;
            }
        }
        xi
    }
}

#[inline]
const fn node_bit(node: usize, axis: usize) -> bool {
    (node >> axis) & 1 == 1
}

#[inline]
fn linear(upper: bool, t: f64) -> f64 {
    if upper { t } else { 1.0 - t }
}

/// An element: a shape and its global node identifiers in local order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    /// Identifier, unique within the element set of its dimension.
    pub id: u32,
    /// Reference shape.
    pub shape: ElementShape,
    /// Global node identifiers, one per local node.
    pub nodes: Vec<u32>,
}

impl Element {
    /// Create an element.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::NodeCountMismatch`] if `nodes` does not match the shape.
    pub fn new(id: u32, shape: ElementShape, nodes: impl Into<Vec<u32>>) -> TypesResult<Self> {
        let nodes = nodes.into();
        if nodes.len() != shape.node_count() {
            return Err(TypesError::NodeCountMismatch {
                id,
                expected: shape.node_count(),
                found: nodes.len(),
            });
        }
        Ok(Self { id, shape, nodes })
    }

    /// Topological dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.shape.dimension()
    }

    /// Global node identifiers of a facet, in facet-local order.
    #[must_use]
    pub fn facet_nodes(&self, facet: &Facet) -> Vec<u32> {
        facet.nodes.iter().map(|&local| self.nodes[local]).collect()
    }
}

/// A location inside an element of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshLocation {
    /// Dimension of the mesh the element belongs to.
    pub dimension: usize,
    /// Element identifier.
    pub element: u32,
    /// Reference coordinates in the element.
    pub xi: Xi,
}

/// The elements of one dimension, in insertion order with lookup by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet {
    dimension: usize,
    elements: Vec<Element>,
    index: HashMap<u32, usize>,
}

impl ElementSet {
    /// Create an empty element set for `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            elements: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Dimension of elements in this set.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element dimension differs from the set's or its
    /// identifier is already used.
    pub fn add(&mut self, element: Element) -> TypesResult<()> {
        if element.dimension() != self.dimension {
            return Err(TypesError::DimensionMismatch {
                id: element.id,
                expected: self.dimension,
                found: element.dimension(),
            });
        }
        if self.index.contains_key(&element.id) {
            return Err(TypesError::DuplicateElement {
                dimension: self.dimension,
                id: element.id,
            });
        }
        self.index.insert(element.id, self.elements.len());
        self.elements.push(element);
        Ok(())
    }

    /// Get an element by identifier.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Element> {
        self.index.get(&id).map(|&i| &self.elements[i])
    }

    /// Check whether an element exists.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Add every element of `other` whose identifier is not yet used here.
    ///
    /// Sets of different dimensions share nothing. Returns the number of
    /// elements added.
    pub fn merge(&mut self, other: &Self) -> usize {
        if other.dimension != self.dimension {
            return 0;
        }
        let before = self.elements.len();
        for element in &other.elements {
            if !self.index.contains_key(&element.id) {
                self.index.insert(element.id, self.elements.len());
                self.elements.push(element.clone());
            }
        }
        self.elements.len() - before
    }

    /// Keep only elements matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&Element) -> bool) {
        self.elements.retain(|e| keep(e));
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
    }
}
