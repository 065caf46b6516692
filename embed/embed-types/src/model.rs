//! A model: nodes, datapoints, elements, fields and groups.

use std::collections::BTreeSet;

use crate::element::{Element, ElementSet};
use crate::error::{TypesError, TypesResult};
use crate::field::{FieldSet, PointKey};
use crate::group::Group;

/// A self-contained model, used both for host models (scaffold plus fitted
/// geometry) and for datasets.
///
/// Elements of dimension 1 to 3 live in separate element sets and reference
/// nodes by identifier. Datapoints are free points outside any element.
///
/// # Example
///
/// ```
/// use embed_types::{Element, ElementShape, Group, Model};
///
/// let mut model = Model::new();
/// model.add_nodes([1, 2]);
/// model.add_element(Element::new(1, ElementShape::Line, vec![1, 2]).unwrap()).unwrap();
/// let mut group = Group::new("line");
/// group.add_element(1, 1);
/// model.add_group(group).unwrap();
///
/// assert_eq!(model.highest_dimension(), 1);
/// assert!(model.has_group("line"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    nodes: BTreeSet<u32>,
    datapoints: BTreeSet<u32>,
    meshes: [ElementSet; 3],
    fields: FieldSet,
    groups: Vec<Group>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            datapoints: BTreeSet::new(),
            meshes: [ElementSet::new(1), ElementSet::new(2), ElementSet::new(3)],
            fields: FieldSet::new(),
            groups: Vec::new(),
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

    /// Node identifiers in ascending order.
    #[must_use]
    pub const fn nodes(&self) -> &BTreeSet<u32> {
        &self.nodes
    }

    /// Datapoint identifiers in ascending order.
    #[must_use]
    pub const fn datapoints(&self) -> &BTreeSet<u32> {
        &self.datapoints
    }

    /// Iterate over every point: nodes first, then datapoints.
    pub fn points(&self) -> impl Iterator<Item = PointKey> + '_ {
        self.nodes
            .iter()
            .map(|&id| PointKey::Node(id))
            .chain(self.datapoints.iter().map(|&id| PointKey::Datapoint(id)))
    }

    /// Check whether a point exists.
    #[must_use]
    pub fn contains_point(&self, key: PointKey) -> bool {
        match key {
            PointKey::Node(id) => self.nodes.contains(&id),
            PointKey::Datapoint(id) => self.datapoints.contains(&id),
        }
    }

    /// Add an element to the mesh of its dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::UnknownNode`] if a node is missing, or the element
    /// set's error for duplicate identifiers.
    pub fn add_element(&mut self, element: Element) -> TypesResult<()> {
        if let Some(&node) = element.nodes.iter().find(|&&n| !self.nodes.contains(&n)) {
            return Err(TypesError::UnknownNode {
                element: element.id,
                node,
            });
        }
        let slot = element.dimension() - 1;
        self.meshes[slot].add(element)
    }

    /// Elements of one dimension, or `None` outside 1..=3.
    #[must_use]
    pub fn mesh(&self, dimension: usize) -> Option<&ElementSet> {
        (1..=3)
            .contains(&dimension)
            .then(|| &self.meshes[dimension - 1])
    }

    /// Get an element by dimension and identifier.
    #[must_use]
    pub fn element(&self, dimension: usize, id: u32) -> Option<&Element> {
        self.mesh(dimension).and_then(|mesh| mesh.get(id))
    }

    /// Highest dimension with any elements, `0` if there are none.
    #[must_use]
    pub fn highest_dimension(&self) -> usize {
        (1..=3)
            .rev()
            .find(|&d| !self.meshes[d - 1].is_empty())
            .unwrap_or(0)
    }

    /// Fields of the model.
    #[must_use]
    pub const fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Mutable fields of the model.
    pub fn fields_mut(&mut self) -> &mut FieldSet {
        &mut self.fields
    }

    /// Add a group.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::DuplicateGroup`] if the name is taken.
    pub fn add_group(&mut self, group: Group) -> TypesResult<()> {
        if self.has_group(group.name()) {
            return Err(TypesError::DuplicateGroup {
                name: group.name().to_string(),
            });
        }
        self.groups.push(group);
        Ok(())
    }

    /// Get a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Get a group by name, creating an empty one if missing.
    pub fn group_or_insert(&mut self, name: &str) -> &mut Group {
        let position = match self.groups.iter().position(|g| g.name() == name) {
            Some(position) => position,
            None => {
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[position]
    }

    /// Check whether a group exists.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.group(name).is_some()
    }

    /// Remove a group by name.
    pub fn remove_group(&mut self, name: &str) -> Option<Group> {
        let position = self.groups.iter().position(|g| g.name() == name)?;
        Some(self.groups.remove(position))
    }

    /// Groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Group names in creation order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(Group::name)
    }

    /// Merge another model sharing this model's identifier spaces.
    ///
    /// Nodes and datapoints are unioned, elements are added unless their
    /// identifier is already present, groups with the same name are merged and
    /// fields are merged by name. Returns the names of fields that clashed in
    /// kind or component count and were left unmerged.
    pub fn merge(&mut self, other: &Self) -> Vec<String> {
        self.nodes.extend(other.nodes.iter().copied());
        self.datapoints.extend(other.datapoints.iter().copied());
        for (mine, theirs) in self.meshes.iter_mut().zip(other.meshes.iter()) {
            mine.merge(theirs);
        }
        for group in &other.groups {
            self.group_or_insert(group.name()).merge(group);
        }
        self.fields.merge(&other.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementShape;
    use crate::field::CoordinateField;
    use nalgebra::Point3;

    fn line_model() -> Model {
        let mut model = Model::new();
        model.add_nodes([1, 2, 3]);
        model
            .add_element(Element::new(1, ElementShape::Line, vec![1, 2]).unwrap())
            .unwrap();
        model
            .add_element(Element::new(2, ElementShape::Line, vec![2, 3]).unwrap())
            .unwrap();
        model
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut model = line_model();
        let result = model.add_element(Element::new(3, ElementShape::Line, vec![3, 4]).unwrap());
        assert!(matches!(result, Err(TypesError::UnknownNode { node: 4, .. })));
    }

    #[test]
    fn test_highest_dimension_and_mesh_lookup() {
        let model = line_model();
        assert_eq!(model.highest_dimension(), 1);
        assert_eq!(model.mesh(1).map(ElementSet::len), Some(2));
        assert!(model.mesh(0).is_none());
        assert!(model.element(1, 2).is_some());
        assert_eq!(Model::new().highest_dimension(), 0);
    }

    #[test]
    fn test_group_or_insert() {
        let mut model = line_model();
        model.group_or_insert("a").add_element(1, 1);
        model.group_or_insert("a").add_element(1, 2);
        assert_eq!(model.group("a").map(|g| g.element_count(1)), Some(2));
        assert!(model.add_group(Group::new("a")).is_err());
    }

    #[test]
    fn test_points_order() {
        let mut model = line_model();
        model.add_datapoints([10, 5]);
        let points: Vec<_> = model.points().collect();
        assert_eq!(points.first(), Some(&PointKey::Node(1)));
        assert_eq!(points.last(), Some(&PointKey::Datapoint(10)));
        assert_eq!(points.len(), 5);
    }

    #[test]
    fn test_merge_models() {
        let mut fitted = line_model();
        let mut coordinates = CoordinateField::new("fitted coordinates", 3).unwrap();
        coordinates.set_point(PointKey::Node(1), Point3::origin());
        fitted.fields_mut().add(coordinates).unwrap();

        let mut scaffold = line_model();
        scaffold.add_node(4);
        scaffold
            .add_element(Element::new(3, ElementShape::Line, vec![3, 4]).unwrap())
            .unwrap();
        let mut body = Group::new("body");
        body.add_elements(1, [1, 2, 3]);
        scaffold.add_group(body).unwrap();
        scaffold
            .fields_mut()
            .add(CoordinateField::new("body coordinates", 3).unwrap())
            .unwrap();

        let conflicts = fitted.merge(&scaffold);
        assert!(conflicts.is_empty());
        assert_eq!(fitted.mesh(1).map(ElementSet::len), Some(3));
        assert_eq!(fitted.group("body").map(|g| g.element_count(1)), Some(3));
        assert_eq!(fitted.fields().len(), 2);
    }
}
