//! Default embed decisions for dataset groups.

use embed_types::{Group, Model};
use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::marker::MarkerGroup;
use crate::record::{GroupOrigin, GroupRecord, GroupTable};

/// Classify every named group of a dataset.
///
/// Each dataset group gets its highest occupied dimension and the number of
/// elements at that dimension, or dimension 0 and its point count if it has
/// no elements. Groups with no members are not enumerated. The default embed
/// flag is off for groups also named in the host, empty groups, and the
/// marker group itself.
///
/// With a complete marker group, one dimension-0 pseudo-group is added per
/// distinct marker name; dataset groups win over same-named pseudo-groups.
///
/// Finally every name present in `prior` takes its prior embed flag.
///
/// # Example
///
/// ```
/// use embed_classify::classify;
/// use embed_types::{Element, ElementShape, Group, Model};
/// use hashbrown::HashMap;
///
/// let mut data = Model::new();
/// data.add_nodes([1, 2]);
/// data.add_element(Element::new(1, ElementShape::Line, vec![1, 2]).unwrap()).unwrap();
/// let mut line = Group::new("line");
/// line.add_element(1, 1);
/// data.add_group(line).unwrap();
///
/// let table = classify(&data, ["bottom"], None, &HashMap::new());
/// let record = table.get("line").unwrap();
/// assert_eq!((record.dimension, record.size, record.embed), (1, 1, true));
/// ```
#[must_use]
pub fn classify<'a>(
    dataset: &Model,
    host_group_names: impl IntoIterator<Item = &'a str>,
    marker: Option<&MarkerGroup>,
    prior: &HashMap<String, bool>,
) -> GroupTable {
    let host: HashSet<&str> = host_group_names.into_iter().collect();
    let mut table = GroupTable::new();

    if let Some(marker) = marker {
        for record in marker_records(dataset, marker, &host) {
            table.insert(record);
        }
    }

    let marker_name = marker.map(MarkerGroup::name);
    for group in dataset.groups() {
        if let Some(mut record) = classify_group(group) {
            record.embed =
                !(host.contains(group.name()) || record.size == 0 || marker_name == Some(group.name()));
            table.insert(record);
        }
    }

    let mut restored = 0_usize;
    for (name, &embed) in prior {
        if table.set_embed(name, embed) {
            restored += 1;
        }
    }

    debug!(
        groups = table.len(),
        embedded = table.embedded().count(),
        restored,
        "classified dataset groups"
    );
    table
}

/// Dimension and size of one dataset group, `None` if it has no members.
fn classify_group(group: &Group) -> Option<GroupRecord> {
    let (dimension, size) = match group.highest_dimension() {
        Some(dimension) => (dimension, group.element_count(dimension)),
        None => (0, group.datapoints().len() + group.nodes().len()),
    };
    if size == 0 {
        return None;
    }
    Some(GroupRecord::new(
        group.name(),
        dimension,
        size,
        true,
        GroupOrigin::Dataset,
    ))
}

/// One pseudo-group record per distinct non-empty marker name.
fn marker_records(dataset: &Model, marker: &MarkerGroup, host: &HashSet<&str>) -> Vec<GroupRecord> {
    if marker.name_field().is_none() {
        debug!(group = marker.name(), "no marker name field, skipping marker names");
        return Vec::new();
    }
    let mut records: Vec<GroupRecord> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (_, name) in marker.named_points(dataset) {
        if let Some(&i) = index.get(name) {
            records[i].size += 1;
        } else {
            let embed = !(host.contains(name) || name == marker.name());
            index.insert(name, records.len());
            records.push(GroupRecord::new(name, 0, 1, embed, GroupOrigin::MarkerName));
        }
    }
    records
}
