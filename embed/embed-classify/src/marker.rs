//! Marker group discovery.
//!
//! A marker group is a dataset group of datapoints, each tagged with a name.
//! Points sharing a name form a zero-dimensional pseudo-group.

use embed_types::{Field, Model, PointKey};
use tracing::debug;

/// Default marker group name when none is configured.
pub const DEFAULT_MARKER_GROUP: &str = "marker";

/// The designated marker group of a dataset and the fields found on it.
///
/// # Example
///
/// ```
/// use embed_classify::MarkerGroup;
/// use embed_types::{CoordinateField, Group, Model, PointKey, StringField};
///
/// let mut data = Model::new();
/// data.add_datapoints([1, 2]);
/// let mut coordinates = CoordinateField::new("coordinates", 3).unwrap();
/// let mut names = StringField::new("marker_name");
/// for id in [1, 2] {
///     coordinates.set_value(PointKey::Datapoint(id), &[0.0, 0.0, 0.0]).unwrap();
///     names.set_value(PointKey::Datapoint(id), "tip");
/// }
/// data.fields_mut().add(coordinates).unwrap();
/// data.fields_mut().add(names).unwrap();
/// let mut group = Group::new("marker");
/// group.add_datapoints([1, 2]);
/// data.add_group(group).unwrap();
///
/// let marker = MarkerGroup::discover(&data, "marker", Some("coordinates")).unwrap();
/// assert_eq!(marker.coordinates_field(), Some("coordinates"));
/// assert_eq!(marker.name_field(), Some("marker_name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerGroup {
    name: String,
    coordinates_field: Option<String>,
    name_field: Option<String>,
}

impl MarkerGroup {
    /// Find the marker group `group_name` in a dataset and its fields.
    ///
    /// Fields are looked up on the group's first datapoint. The coordinates
    /// field is `data_coordinates` if it is defined there, otherwise the first
    /// coordinate field defined there. The name field is the first string
    /// field defined there.
    ///
    /// Returns `None` if the dataset has no group of that name.
    #[must_use]
    pub fn discover(dataset: &Model, group_name: &str, data_coordinates: Option<&str>) -> Option<Self> {
        let group = dataset.group(group_name)?;
        let mut marker = Self {
            name: group_name.to_string(),
            coordinates_field: None,
            name_field: None,
        };

        if let Some(&first) = group.datapoints().first() {
            let key = PointKey::Datapoint(first);
            let fields = dataset.fields();
            marker.coordinates_field = data_coordinates
                .filter(|name| {
                    fields
                        .coordinates(name)
                        .is_some_and(|field| field.is_defined_at(key))
                })
                .map(str::to_string)
                .or_else(|| {
                    fields
                        .coordinate_fields()
                        .find(|field| field.is_defined_at(key))
                        .map(|field| field.name().to_string())
                });
            marker.name_field = fields
                .iter()
                .find(|field| matches!(field, Field::Text(_)) && field.is_defined_at(key))
                .map(|field| field.name().to_string());
        }

        if !marker.is_complete() {
            debug!(
                group = group_name,
                coordinates = ?marker.coordinates_field,
                names = ?marker.name_field,
                "marker group is empty or has no coordinates or name field"
            );
        }
        Some(marker)
    }

    /// Marker group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Coordinate field carried by the marker points, if found.
    #[must_use]
    pub fn coordinates_field(&self) -> Option<&str> {
        self.coordinates_field.as_deref()
    }

    /// String field naming each marker point, if found.
    #[must_use]
    pub fn name_field(&self) -> Option<&str> {
        self.name_field.as_deref()
    }

    /// Check whether both the coordinates and the name field were found.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.coordinates_field.is_some() && self.name_field.is_some()
    }

    /// Marker datapoints with their non-empty names, in datapoint order.
    ///
    /// Empty when the group or the name field is missing.
    pub fn named_points<'a>(&'a self, dataset: &'a Model) -> impl Iterator<Item = (u32, &'a str)> + 'a {
        let names = self
            .name_field
            .as_deref()
            .and_then(|name| dataset.fields().text(name));
        let points = dataset
            .group(&self.name)
            .map(|group| group.datapoints().iter().copied());
        points.into_iter().flatten().filter_map(move |id| {
            names
                .and_then(|field| field.value(PointKey::Datapoint(id)))
                .filter(|name| !name.is_empty())
                .map(|name| (id, name))
        })
    }

    /// Marker datapoints carrying the given name.
    #[must_use]
    pub fn points_named(&self, dataset: &Model, marker_name: &str) -> Vec<u32> {
        self.named_points(dataset)
            .filter(|(_, name)| *name == marker_name)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use embed_types::{CoordinateField, Group, Model, PointKey, StringField};

    /// Dataset with a marker group of four points named `tip 1`, `tip 2`,
    /// `tip 1` and an empty name.
    pub fn marker_dataset() -> Model {
        let mut data = Model::new();
        data.add_datapoints([10, 11, 12, 13]);
        let mut coordinates = CoordinateField::new("coordinates", 3).unwrap();
        let mut marker_coordinates = CoordinateField::new("marker coordinates", 3).unwrap();
        let mut names = StringField::new("marker_name");
        for (id, name) in [(10, "tip 1"), (11, "tip 2"), (12, "tip 1"), (13, "")] {
            let key = PointKey::Datapoint(id);
            marker_coordinates.set_value(key, &[f64::from(id), 0.0, 0.0]).unwrap();
            names.set_value(key, name);
        }
        coordinates.set_value(PointKey::Datapoint(13), &[0.0, 0.0, 0.0]).unwrap();
        data.fields_mut().add(coordinates).unwrap();
        data.fields_mut().add(marker_coordinates).unwrap();
        data.fields_mut().add(names).unwrap();
        let mut group = Group::new("marker");
        group.add_datapoints([10, 11, 12, 13]);
        data.add_group(group).unwrap();
        data
    }
}
