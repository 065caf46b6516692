//! Fields over model points.
//!
//! Fields are a closed set of kinds: coordinates (1 to 3 real components,
//! interpolated over elements), stored strings, and stored mesh locations.
//! Values are stored per point and keyed by [`PointKey`].

use hashbrown::HashMap;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementShape, MeshLocation, Xi};
use crate::error::{TypesError, TypesResult};

/// Identifies a point of a model: a node (used by elements) or a free datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointKey {
    /// A node, referenced by elements.
    Node(u32),
    /// A datapoint, not referenced by elements.
    Datapoint(u32),
}

/// A real-valued coordinate field with 1 to 3 components.
///
/// Unused components are stored as zero so distances can always be computed
/// in three dimensions.
///
/// # Example
///
/// ```
/// use embed_types::{CoordinateField, PointKey, Point3};
///
/// let mut field = CoordinateField::new("coordinates", 3).unwrap();
/// field.set_point(PointKey::Node(1), Point3::new(1.0, 2.0, 3.0));
/// assert!(field.is_defined_at(PointKey::Node(1)));
/// assert!(!field.is_defined_at(PointKey::Datapoint(1)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateField {
    name: String,
    components: usize,
    values: HashMap<PointKey, Point3<f64>>,
}

impl CoordinateField {
    /// Create an empty coordinate field.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidComponentCount`] unless `1 <= components <= 3`.
    pub fn new(name: impl Into<String>, components: usize) -> TypesResult<Self> {
        let name = name.into();
        if !(1..=3).contains(&components) {
            return Err(TypesError::InvalidComponentCount { name, components });
        }
        Ok(Self {
            name,
            components,
            values: HashMap::new(),
        })
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Number of components.
    #[must_use]
    pub const fn components(&self) -> usize {
        self.components
    }

    /// Set the value at a point from a component slice.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ValueLength`] if the slice length differs from the
    /// component count.
    pub fn set_value(&mut self, key: PointKey, value: &[f64]) -> TypesResult<()> {
        if value.len() != self.components {
            return Err(TypesError::ValueLength {
                name: self.name.clone(),
                expected: self.components,
                found: value.len(),
            });
        }
        let mut point = Point3::origin();
        point.coords.as_mut_slice()[..value.len()].copy_from_slice(value);
        self.values.insert(key, point);
        Ok(())
    }

    /// Set the value at a point; components past the field's count are dropped.
    pub fn set_point(&mut self, key: PointKey, point: Point3<f64>) {
        let mut stored = Point3::origin();
        for i in 0..self.components {
            stored[i] = point[i];
        }
        self.values.insert(key, stored);
    }

    /// Value at a point.
    #[must_use]
    pub fn value(&self, key: PointKey) -> Option<Point3<f64>> {
        self.values.get(&key).copied()
    }

    /// Check whether the field has a value at a point.
    #[must_use]
    pub fn is_defined_at(&self, key: PointKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Check whether the field is defined over a whole element.
    #[must_use]
    pub fn is_defined_on(&self, element: &Element) -> bool {
        element
            .nodes
            .iter()
            .all(|&node| self.values.contains_key(&PointKey::Node(node)))
    }

    /// Values at the element's nodes in local order, if defined at all of them.
    #[must_use]
    pub fn element_values(&self, element: &Element) -> Option<Vec<Point3<f64>>> {
        element
            .nodes
            .iter()
            .map(|&node| self.value(PointKey::Node(node)))
            .collect()
    }

    /// Evaluate the field inside an element.
    #[must_use]
    pub fn evaluate(&self, element: &Element, xi: &Xi) -> Option<Point3<f64>> {
        self.element_values(element)
            .map(|values| interpolate(element.shape, &values, xi))
    }

    /// Iterate over the points where the field is defined.
    pub fn defined_points(&self) -> impl Iterator<Item = PointKey> + '_ {
        self.values.keys().copied()
    }

    /// Number of points with a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the field has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn retain_points(&mut self, keep: &impl Fn(PointKey) -> bool) {
        self.values.retain(|key, _| keep(*key));
    }

    fn merge_values(&mut self, other: &Self) {
        self.values
            .extend(other.values.iter().map(|(key, value)| (*key, *value)));
    }
}

/// Interpolate nodal values at `xi` with the shape's basis.
#[must_use]
pub fn interpolate(shape: ElementShape, values: &[Point3<f64>], xi: &Xi) -> Point3<f64> {
    let basis = shape.basis(xi);
    let mut point = Point3::origin();
    for (value, weight) in values.iter().zip(basis.iter()) {
        point.coords += value.coords * *weight;
    }
    point
}

/// A field holding one string per point, such as marker names.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringField {
    name: String,
    values: HashMap<PointKey, String>,
}

impl StringField {
    /// Create an empty string field.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the string at a point.
    pub fn set_value(&mut self, key: PointKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// String at a point.
    #[must_use]
    pub fn value(&self, key: PointKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Check whether the field has a value at a point.
    #[must_use]
    pub fn is_defined_at(&self, key: PointKey) -> bool {
        self.values.contains_key(&key)
    }
}

/// A field storing a host mesh location per point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshLocationField {
    name: String,
    values: HashMap<PointKey, MeshLocation>,
}

impl MeshLocationField {
    /// Create an empty mesh location field.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a location at a point.
    pub fn set_value(&mut self, key: PointKey, location: MeshLocation) {
        self.values.insert(key, location);
    }

    /// Location at a point.
    #[must_use]
    pub fn value(&self, key: PointKey) -> Option<&MeshLocation> {
        self.values.get(&key)
    }

    /// Iterate over stored locations.
    pub fn iter(&self) -> impl Iterator<Item = (PointKey, &MeshLocation)> {
        self.values.iter().map(|(key, location)| (*key, location))
    }

    /// Number of stored locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no locations are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named field of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    /// Real coordinates, interpolated over elements.
    Coordinates(CoordinateField),
    /// Stored strings.
    Text(StringField),
    /// Stored host mesh locations.
    MeshLocation(MeshLocationField),
}

impl Field {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Coordinates(f) => f.name(),
            Self::Text(f) => f.name(),
            Self::MeshLocation(f) => f.name(),
        }
    }

    fn set_name(&mut self, name: String) {
        match self {
            Self::Coordinates(f) => f.set_name(name),
            Self::Text(f) => f.name = name,
            Self::MeshLocation(f) => f.name = name,
        }
    }

    /// The coordinate field, if this is one.
    #[must_use]
    pub const fn as_coordinates(&self) -> Option<&CoordinateField> {
        match self {
            Self::Coordinates(f) => Some(f),
            _ => None,
        }
    }

    /// The string field, if this is one.
    #[must_use]
    pub const fn as_text(&self) -> Option<&StringField> {
        match self {
            Self::Text(f) => Some(f),
            _ => None,
        }
    }

    /// Check whether the field has a value at a point.
    #[must_use]
    pub fn is_defined_at(&self, key: PointKey) -> bool {
        match self {
            Self::Coordinates(f) => f.is_defined_at(key),
            Self::Text(f) => f.is_defined_at(key),
            Self::MeshLocation(f) => f.values.contains_key(&key),
        }
    }

    fn retain_points(&mut self, keep: &impl Fn(PointKey) -> bool) {
        match self {
            Self::Coordinates(f) => f.retain_points(keep),
            Self::Text(f) => f.values.retain(|key, _| keep(*key)),
            Self::MeshLocation(f) => f.values.retain(|key, _| keep(*key)),
        }
    }

    fn merge_values(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Self::Coordinates(a), Self::Coordinates(b)) if a.components == b.components => {
                a.merge_values(b);
                true
            }
            (Self::Text(a), Self::Text(b)) => {
                a.values
                    .extend(b.values.iter().map(|(k, v)| (*k, v.clone())));
                true
            }
            (Self::MeshLocation(a), Self::MeshLocation(b)) => {
                a.values.extend(b.values.iter().map(|(k, v)| (*k, *v)));
                true
            }
            _ => false,
        }
    }
}

impl From<CoordinateField> for Field {
    fn from(field: CoordinateField) -> Self {
        Self::Coordinates(field)
    }
}

impl From<StringField> for Field {
    fn from(field: StringField) -> Self {
        Self::Text(field)
    }
}

impl From<MeshLocationField> for Field {
    fn from(field: MeshLocationField) -> Self {
        Self::MeshLocation(field)
    }
}

/// An ordered collection of uniquely named fields.
///
/// Order is creation order, which field discovery relies on when it falls
/// back to "the first coordinate field".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Create an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::DuplicateField`] if the name is taken.
    pub fn add(&mut self, field: impl Into<Field>) -> TypesResult<()> {
        let field = field.into();
        if self.contains(field.name()) {
            return Err(TypesError::DuplicateField {
                name: field.name().to_string(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Add a field, replacing any field of the same name in place.
    pub fn insert(&mut self, field: impl Into<Field>) {
        let field = field.into();
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Get a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Get a coordinate field by name.
    #[must_use]
    pub fn coordinates(&self, name: &str) -> Option<&CoordinateField> {
        self.get(name).and_then(Field::as_coordinates)
    }

    /// Get a string field by name.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&StringField> {
        self.get(name).and_then(Field::as_text)
    }

    /// Check whether a field of this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove a field by name.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let position = self.fields.iter().position(|f| f.name() == name)?;
        Some(self.fields.remove(position))
    }

    /// Rename a field.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::FieldNotFound`] if `old` does not exist, or
    /// [`TypesError::DuplicateField`] if `new` is already taken.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> TypesResult<()> {
        let new = new.into();
        if old == new {
            return if self.contains(old) {
                Ok(())
            } else {
                Err(TypesError::FieldNotFound { name: old.to_string() })
            };
        }
        if self.contains(&new) {
            return Err(TypesError::DuplicateField { name: new });
        }
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name() == old)
            .ok_or_else(|| TypesError::FieldNotFound { name: old.to_string() })?;
        field.set_name(new);
        Ok(())
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Iterate over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterate over coordinate fields in order.
    pub fn coordinate_fields(&self) -> impl Iterator<Item = &CoordinateField> {
        self.fields.iter().filter_map(Field::as_coordinates)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drop every value stored at a point rejected by `keep`.
    pub fn retain_points(&mut self, keep: impl Fn(PointKey) -> bool) {
        for field in &mut self.fields {
            field.retain_points(&keep);
        }
    }

    /// Merge another field set: same-named fields of the same kind have their
    /// values merged, other fields are appended. A same-named field of a
    /// different kind keeps the existing one.
    ///
    /// Returns the names of fields that could not be merged.
    pub fn merge(&mut self, other: &Self) -> Vec<String> {
        let mut conflicts = Vec::new();
        for field in &other.fields {
            match self.fields.iter_mut().find(|f| f.name() == field.name()) {
                Some(existing) => {
                    if !existing.merge_values(field) {
                        conflicts.push(field.name().to_string());
                    }
                }
                None => self.fields.push(field.clone()),
            }
        }
        conflicts
    }
}
