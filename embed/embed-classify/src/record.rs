//! Per-group classification records.

use std::collections::BTreeMap;

use hashbrown::HashMap;

/// Where a classified group comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupOrigin {
    /// A named group of the dataset.
    Dataset,
    /// Marker points sharing a name.
    MarkerName,
}

/// Classification of one named group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupRecord {
    /// Group name.
    pub name: String,
    /// Highest occupied dimension, 0 for point groups.
    pub dimension: usize,
    /// Number of members at `dimension`.
    pub size: usize,
    /// Whether the group is embedded in the output.
    pub embed: bool,
    /// Where the group comes from.
    pub origin: GroupOrigin,
}

impl GroupRecord {
    /// Create a record.
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize, size: usize, embed: bool, origin: GroupOrigin) -> Self {
        Self {
            name: name.into(),
            dimension,
            size,
            embed,
            origin,
        }
    }

    /// Check whether this record is a marker pseudo-group.
    #[must_use]
    pub fn is_marker_name(&self) -> bool {
        self.origin == GroupOrigin::MarkerName
    }
}

/// Group records keyed by name, iterated in name order.
///
/// # Example
///
/// ```
/// use embed_classify::{GroupOrigin, GroupRecord, GroupTable};
///
/// let mut table = GroupTable::new();
/// table.insert(GroupRecord::new("line", 1, 4, true, GroupOrigin::Dataset));
/// assert!(table.is_embed("line"));
/// assert!(table.set_embed("line", false));
/// assert!(!table.is_embed("line"));
/// assert!(!table.set_embed("missing", true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupTable {
    records: BTreeMap<String, GroupRecord>,
}

impl GroupTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record of the same name.
    pub fn insert(&mut self, record: GroupRecord) -> Option<GroupRecord> {
        self.records.insert(record.name.clone(), record)
    }

    /// Get a record by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GroupRecord> {
        self.records.get(name)
    }

    /// Check if a record exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupRecord> {
        self.records.values()
    }

    /// Embed flag of a group; `false` if unknown.
    #[must_use]
    pub fn is_embed(&self, name: &str) -> bool {
        self.get(name).is_some_and(|record| record.embed)
    }

    /// Set a group's embed flag. Returns `false` if the group is unknown.
    pub fn set_embed(&mut self, name: &str, embed: bool) -> bool {
        match self.records.get_mut(name) {
            Some(record) => {
                record.embed = embed;
                true
            }
            None => false,
        }
    }

    /// Embed flags of every record, for carrying over to a reclassification.
    #[must_use]
    pub fn embed_flags(&self) -> HashMap<String, bool> {
        self.records
            .iter()
            .map(|(name, record)| (name.clone(), record.embed))
            .collect()
    }

    /// Records with the embed flag set.
    pub fn embedded(&self) -> impl Iterator<Item = &GroupRecord> {
        self.iter().filter(|record| record.embed)
    }
}

impl FromIterator<GroupRecord> for GroupTable {
    fn from_iter<I: IntoIterator<Item = GroupRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}
