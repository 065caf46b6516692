//! The set of dataset members kept in the output.

use std::collections::BTreeSet;

use embed_classify::{GroupOrigin, GroupTable, MarkerGroup};
use embed_types::{Model, PointKey};
use tracing::debug;

/// Elements and points kept in the output, computed before anything is copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedSet {
    elements: [BTreeSet<u32>; 3],
    nodes: BTreeSet<u32>,
    datapoints: BTreeSet<u32>,
    marker_groups: Vec<(String, Vec<u32>)>,
    skipped_marker_groups: Vec<String>,
}

impl RetainedSet {
    /// Collect the members of every embedded group.
    ///
    /// Dataset groups contribute their elements at and below the classified
    /// dimension, the nodes of those elements, and their own points. Marker
    /// pseudo-groups contribute the marker datapoints carrying their name; they
    /// are skipped when the marker group or its name field is unavailable.
    #[must_use]
    pub fn compute(dataset: &Model, table: &GroupTable, marker: Option<&MarkerGroup>) -> Self {
        let mut retained = Self::default();
        for record in table.embedded() {
            match record.origin {
                GroupOrigin::Dataset => {
                    let Some(group) = dataset.group(&record.name) else {
                        continue;
                    };
                    for dimension in 1..=record.dimension {
                        for id in group.elements(dimension) {
                            if let Some(element) = dataset.element(dimension, id) {
                                retained.elements[dimension - 1].insert(id);
                                retained.nodes.extend(element.nodes.iter().copied());
                            }
                        }
                    }
                    retained.nodes.extend(group.nodes().iter().copied());
                    retained.datapoints.extend(group.datapoints().iter().copied());
                }
                GroupOrigin::MarkerName => {
                    let points = marker
                        .filter(|marker| marker.name_field().is_some())
                        .map(|marker| marker.points_named(dataset, &record.name))
                        .unwrap_or_default();
                    if points.is_empty() {
                        debug!(group = %record.name, "cannot materialize marker group");
                        retained.skipped_marker_groups.push(record.name.clone());
                        continue;
                    }
                    retained.datapoints.extend(points.iter().copied());
                    retained.marker_groups.push((record.name.clone(), points));
                }
            }
        }
        retained
    }

    /// Check whether an element is kept.
    #[must_use]
    pub fn contains_element(&self, dimension: usize, id: u32) -> bool {
        (1..=3).contains(&dimension) && self.elements[dimension - 1].contains(&id)
    }

    /// Check whether a point is kept.
    #[must_use]
    pub fn contains_point(&self, key: PointKey) -> bool {
        match key {
            PointKey::Node(id) => self.nodes.contains(&id),
            PointKey::Datapoint(id) => self.datapoints.contains(&id),
        }
    }

    /// Kept nodes.
    #[must_use]
    pub const fn nodes(&self) -> &BTreeSet<u32> {
        &self.nodes
    }

    /// Kept datapoints.
    #[must_use]
    pub const fn datapoints(&self) -> &BTreeSet<u32> {
        &self.datapoints
    }

    /// Number of kept elements over all dimensions.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.iter().map(BTreeSet::len).sum()
    }

    /// Marker pseudo-groups to materialize, with their datapoints.
    #[must_use]
    pub fn marker_groups(&self) -> &[(String, Vec<u32>)] {
        &self.marker_groups
    }

    /// Embedded marker pseudo-groups that could not be materialized.
    #[must_use]
    pub fn skipped_marker_groups(&self) -> &[String] {
        &self.skipped_marker_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{data_model, table_for};

    #[test]
    fn test_dataset_groups_keep_lower_dimensions_and_nodes() {
        let data = data_model();
        let table = table_for(&data, &["cube"]);
        let retained = RetainedSet::compute(&data, &table, None);
        assert!(retained.contains_element(3, 1));
        assert!(retained.contains_element(2, 1));
        assert_eq!(retained.nodes().len(), 8);
        assert!(!retained.contains_element(1, 1));
        assert!(retained.datapoints().is_empty());
    }

    #[test]
    fn test_classified_dimension_limits_elements() {
        let data = data_model();
        let mut table = table_for(&data, &["cube"]);
        let mut record = table.get("cube").cloned().unwrap();
        record.dimension = 2;
        table.insert(record);
        let retained = RetainedSet::compute(&data, &table, None);
        assert!(!retained.contains_element(3, 1));
        assert!(retained.contains_element(2, 1));
    }

    #[test]
    fn test_marker_names_materialized() {
        let data = data_model();
        let marker = MarkerGroup::discover(&data, "marker", Some("coordinates"));
        let table = table_for(&data, &["tip 1"]);
        let retained = RetainedSet::compute(&data, &table, marker.as_ref());
        assert_eq!(retained.marker_groups().len(), 1);
        assert_eq!(retained.marker_groups()[0].1, [100, 102]);
        assert!(retained.contains_point(PointKey::Datapoint(100)));
        assert!(!retained.contains_point(PointKey::Datapoint(101)));
    }

    #[test]
    fn test_marker_names_skipped_without_marker_group() {
        let data = data_model();
        let table = table_for(&data, &["tip 1"]);
        let retained = RetainedSet::compute(&data, &table, None);
        assert!(retained.marker_groups().is_empty());
        assert_eq!(retained.skipped_marker_groups(), ["tip 1"]);
    }
}
