//! Filtered copy of a dataset with regenerated material coordinates.

use embed_classify::{GroupOrigin, GroupTable, MarkerGroup};
use embed_locate::EmbeddingMap;
use embed_types::{CoordinateField, Group, MeshLocationField, Model, Point3, PointKey};
use tracing::debug;

use crate::error::{AssembleError, AssembleResult};
use crate::output::{AssemblyReport, OutputDataSet};
use crate::retain::RetainedSet;

/// Default name of the host location field written to the output.
pub const HOST_LOCATION_FIELD: &str = "host location";

/// Everything assembly reads besides the embedding map.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// The dataset to filter.
    pub dataset: &'a Model,
    /// Classified groups with their embed flags.
    pub groups: &'a GroupTable,
    /// The marker group, if any.
    pub marker: Option<&'a MarkerGroup>,
    /// Data coordinates field of the dataset.
    pub data_coordinates: &'a str,
    /// Preferred name of the output material coordinates field.
    pub material_field: &'a str,
}

/// Build the output dataset.
///
/// Keeps the members of every embedded group, the marker group and the
/// materialized marker pseudo-groups; every other element, point and group is
/// dropped. Every kept point is then embedded and its material coordinates
/// written to a new field, renamed `material <name>` if the name is taken.
/// The host locations are stored alongside.
///
/// Assembly is a pure function of its inputs; calling it again recomputes the
/// output from scratch.
///
/// # Errors
///
/// Returns [`AssembleError::DataCoordinatesNotFound`] if the data coordinates
/// field is missing.
pub fn assemble<M>(input: &AssemblyInput<'_>, map: &M) -> AssembleResult<OutputDataSet>
where
    M: EmbeddingMap + ?Sized,
{
    let dataset = input.dataset;
    let data_field = dataset
        .fields()
        .coordinates(input.data_coordinates)
        .ok_or_else(|| AssembleError::DataCoordinatesNotFound {
            name: input.data_coordinates.to_string(),
        })?;

    let retained = RetainedSet::compute(dataset, input.groups, input.marker);
    let mut output = filtered_copy(dataset, input, &retained)?;

    let material_name = unique_field_name(input.material_field, |name| output.fields().contains(name));
    let renamed_from = (material_name != input.material_field).then(|| {
        debug!(
            field = input.material_field,
            renamed = %material_name,
            "material field name collides with a data field"
        );
        input.material_field.to_string()
    });
    let location_name = unique_field_name(HOST_LOCATION_FIELD, |name| {
        name == material_name || output.fields().contains(name)
    });

    // Marker points may carry their own coordinates.
    let marker_field = input
        .marker
        .and_then(MarkerGroup::coordinates_field)
        .filter(|name| *name != input.data_coordinates)
        .and_then(|name| dataset.fields().coordinates(name));
    let marker_points = input
        .marker
        .and_then(|marker| dataset.group(marker.name()))
        .map(|group| group.datapoints().clone())
        .unwrap_or_default();

    let mut keys: Vec<PointKey> = Vec::new();
    let mut points: Vec<Point3<f64>> = Vec::new();
    let mut unresolved = 0_usize;
    for key in output.points() {
        let value = match (key, marker_field) {
            (PointKey::Datapoint(id), Some(field)) if marker_points.contains(&id) => {
                field.value(key).or_else(|| data_field.value(key))
            }
            _ => data_field.value(key),
        };
        match value {
            Some(point) => {
                keys.push(key);
                points.push(point);
            }
            None => unresolved += 1,
        }
    }

    let mut material = CoordinateField::new(material_name.clone(), map.material_components())?;
    let mut locations = MeshLocationField::new(location_name.clone());
    for (key, embedding) in keys.into_iter().zip(map.embed_all(&points)) {
        match embedding {
            Some(embedding) => {
                material.set_point(key, embedding.material);
                locations.set_value(key, embedding.location);
            }
            None => unresolved += 1,
        }
    }
    output.fields_mut().add(material)?;
    output.fields_mut().add(locations)?;

    let report = AssemblyReport {
        material_field: material_name,
        renamed_from,
        location_field: location_name,
        skipped_marker_groups: retained.skipped_marker_groups().to_vec(),
        unresolved_points: unresolved,
        retained_elements: retained.element_count(),
        retained_nodes: output.nodes().len(),
        retained_datapoints: output.datapoints().len(),
    };
    debug!(
        elements = report.retained_elements,
        nodes = report.retained_nodes,
        datapoints = report.retained_datapoints,
        unresolved = report.unresolved_points,
        skipped_markers = report.skipped_marker_groups.len(),
        "Assembled output dataset"
    );
    Ok(OutputDataSet::new(output, report))
}

/// Copy the retained members of a dataset and the groups that survive.
fn filtered_copy(dataset: &Model, input: &AssemblyInput<'_>, retained: &RetainedSet) -> AssembleResult<Model> {
    let mut output = Model::new();
    output.add_nodes(dataset.nodes().intersection(retained.nodes()).copied());
    output.add_datapoints(dataset.datapoints().intersection(retained.datapoints()).copied());
    for dimension in 1..=3 {
        let Some(mesh) = dataset.mesh(dimension) else {
            continue;
        };
        for element in mesh.iter().filter(|e| retained.contains_element(dimension, e.id)) {
            output.add_element(element.clone())?;
        }
    }

    let mut fields = dataset.fields().clone();
    fields.retain_points(|key| retained.contains_point(key));
    *output.fields_mut() = fields;

    let marker_name = input.marker.map(MarkerGroup::name);
    for group in dataset.groups() {
        let embedded = input
            .groups
            .get(group.name())
            .is_some_and(|record| record.embed && record.origin == GroupOrigin::Dataset);
        if !embedded && marker_name != Some(group.name()) {
            continue;
        }
        let mut group = group.clone();
        group.retain(
            |dimension, id| retained.contains_element(dimension, id),
            |key| retained.contains_point(key),
        );
        output.add_group(group)?;
    }

    for (name, points) in retained.marker_groups() {
        if output.has_group(name) {
            continue;
        }
        let mut group = Group::new(name.clone());
        group.add_datapoints(points.iter().copied());
        output.add_group(group)?;
    }
    Ok(output)
}

/// `name` if free, else `material <name>`, then `material <name> 2`, ...
fn unique_field_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let base = format!("material {name}");
    let mut candidate = base.clone();
    let mut suffix = 2_u32;
    while taken(&candidate) {
        candidate = format!("{base} {suffix}");
        suffix += 1;
    }
    candidate
}
