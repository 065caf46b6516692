//! Named groups of elements and points.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::PointKey;

/// A named subset of a model: elements of each dimension, nodes and datapoints.
///
/// Members are kept sorted so iteration is deterministic.
///
/// # Example
///
/// ```
/// use embed_types::Group;
///
/// let mut group = Group::new("line");
/// group.add_elements(1, [1, 2]);
/// group.add_nodes([1, 2, 3]);
/// assert_eq!(group.highest_dimension(), Some(1));
/// assert_eq!(group.element_count(1), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Group {
    name: String,
    elements: [BTreeSet<u32>; 3],
    nodes: BTreeSet<u32>,
    datapoints: BTreeSet<u32>,
}

impl Group {
    /// Create an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn dimension_slot(dimension: usize) -> Option<usize> {
        (1..=3).contains(&dimension).then(|| dimension - 1)
    }

    /// Add an element of the given dimension. Dimensions outside 1..=3 are ignored.
    pub fn add_element(&mut self, dimension: usize, id: u32) {
        if let Some(slot) = Self::dimension_slot(dimension) {
            self.elements[slot].insert(id);
        }
    }

    /// Add several elements of the given dimension.
    pub fn add_elements(&mut self, dimension: usize, ids: impl IntoIterator<Item = u32>) {
        if let Some(slot) = Self::dimension_slot(dimension) {
            self.elements[slot].extend(ids);
        }
    }

    /// Add a node.
    pub fn add_node(&mut self, id: u32) {
        self.nodes.insert(id);
    }

    /// Add several nodes.
    pub fn add_nodes(&mut self, ids: impl IntoIterator<Item = u32>) {
        self.nodes.extend(ids);
    }

    /// Add a datapoint.
    pub fn add_datapoint(&mut self, id: u32) {
        self.datapoints.insert(id);
    }

    /// Add several datapoints.
    pub fn add_datapoints(&mut self, ids: impl IntoIterator<Item = u32>) {
        self.datapoints.extend(ids);
    }

    /// Element identifiers of one dimension, in ascending order.
    pub fn elements(&self, dimension: usize) -> impl Iterator<Item = u32> + '_ {
        Self::dimension_slot(dimension)
            .into_iter()
            .flat_map(move |slot| self.elements[slot].iter().copied())
    }

    /// Check whether an element of the given dimension is a member.
    #[must_use]
    pub fn contains_element(&self, dimension: usize, id: u32) -> bool {
        Self::dimension_slot(dimension).is_some_and(|slot| self.elements[slot].contains(&id))
    }

    /// Number of elements of one dimension.
    #[must_use]
    pub fn element_count(&self, dimension: usize) -> usize {
        Self::dimension_slot(dimension).map_or(0, |slot| self.elements[slot].len())
    }

    /// Highest dimension with at least one member element.
    #[must_use]
    pub fn highest_dimension(&self) -> Option<usize> {
        (1..=3).rev().find(|&d| self.element_count(d) > 0)
    }

    /// Node identifiers.
    #[must_use]
    pub const fn nodes(&self) -> &BTreeSet<u32> {
        &self.nodes
    }

    /// Datapoint identifiers.
    #[must_use]
    pub const fn datapoints(&self) -> &BTreeSet<u32> {
        &self.datapoints
    }

    /// Check whether a point is a member.
    #[must_use]
    pub fn contains_point(&self, key: PointKey) -> bool {
        match key {
            PointKey::Node(id) => self.nodes.contains(&id),
            PointKey::Datapoint(id) => self.datapoints.contains(&id),
        }
    }

    /// Check if the group has no members at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(BTreeSet::is_empty)
            && self.nodes.is_empty()
            && self.datapoints.is_empty()
    }

    /// Keep only members accepted by the predicates.
    pub fn retain(
        &mut self,
        keep_element: impl Fn(usize, u32) -> bool,
        keep_point: impl Fn(PointKey) -> bool,
    ) {
        for (slot, elements) in self.elements.iter_mut().enumerate() {
            elements.retain(|&id| keep_element(slot + 1, id));
        }
        self.nodes.retain(|&id| keep_point(PointKey::Node(id)));
        self.datapoints.retain(|&id| keep_point(PointKey::Datapoint(id)));
    }

    /// Add every member of `other` to this group.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.elements.iter_mut().zip(other.elements.iter()) {
            mine.extend(theirs.iter().copied());
        }
        self.nodes.extend(other.nodes.iter().copied());
        self.datapoints.extend(other.datapoints.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_group() {
        let group = Group::new("empty");
        assert!(group.is_empty());
        assert_eq!(group.highest_dimension(), None);
    }

    #[test]
    fn test_out_of_range_dimension_ignored() {
        let mut group = Group::new("g");
        group.add_element(0, 1);
        group.add_element(4, 1);
        assert!(group.is_empty());
        assert_eq!(group.elements(7).count(), 0);
    }

    #[test]
    fn test_highest_dimension() {
        let mut group = Group::new("g");
        group.add_elements(1, [1, 2, 3]);
        group.add_element(2, 1);
        assert_eq!(group.highest_dimension(), Some(2));
        assert_eq!(group.element_count(2), 1);
    }

    #[test]
    fn test_retain_and_merge() {
        let mut group = Group::new("g");
        group.add_elements(3, [1, 2]);
        group.add_nodes([1, 2, 3]);
        group.add_datapoints([7, 8]);
        group.retain(|_, id| id == 2, |key| key != PointKey::Node(1) && key != PointKey::Datapoint(8));
        assert_eq!(group.elements(3).collect::<Vec<_>>(), [2]);
        assert_eq!(group.nodes().len(), 2);
        assert!(group.contains_point(PointKey::Datapoint(7)));
        assert!(!group.contains_point(PointKey::Datapoint(8)));

        let mut other = Group::new("g");
        other.add_element(3, 5);
        group.merge(&other);
        assert!(group.contains_element(3, 5));
    }
}
