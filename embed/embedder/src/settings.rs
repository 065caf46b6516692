//! Persisted engine settings.

use std::collections::BTreeMap;

use embed_classify::GroupTable;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::EmbedderResult;

/// Saved state of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Whether the group is embedded.
    pub embed: bool,
    /// Classified dimension.
    pub dimension: usize,
    /// Classified size.
    pub size: usize,
}

/// Engine settings, exchanged as JSON.
///
/// Field names are hints resolved on load; the group data carries embed
/// flags over to the next classification.
///
/// # Example
///
/// ```
/// use embedder::EmbedderSettings;
///
/// let json = r#"{
///     "dataCoordinatesField": "coordinates",
///     "fittedCoordinatesField": null,
///     "materialCoordinatesField": null,
///     "dataMarkerGroup": "marker",
///     "diagnosticLevel": 1,
///     "groupData": {"line": {"embed": false, "dimension": 1, "size": 3}}
/// }"#;
/// let settings = EmbedderSettings::from_json(json).unwrap();
/// assert_eq!(settings.data_coordinates_field.as_deref(), Some("coordinates"));
/// assert!(!settings.group_data["line"].embed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedderSettings {
    /// Data coordinates field name.
    pub data_coordinates_field: Option<String>,
    /// Fitted coordinates field name.
    pub fitted_coordinates_field: Option<String>,
    /// Material coordinates field name.
    pub material_coordinates_field: Option<String>,
    /// Marker group name.
    pub data_marker_group: Option<String>,
    /// Host group every location is restricted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_group: Option<String>,
    /// Diagnostic verbosity; degraded conditions are reported above 0.
    #[serde(default)]
    pub diagnostic_level: u32,
    /// Saved group states by name.
    #[serde(default)]
    pub group_data: BTreeMap<String, GroupSettings>,
}

impl EmbedderSettings {
    /// Create default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> EmbedderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> EmbedderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Embed flags to carry into a classification.
    #[must_use]
    pub fn embed_flags(&self) -> HashMap<String, bool> {
        self.group_data
            .iter()
            .map(|(name, group)| (name.clone(), group.embed))
            .collect()
    }

    /// Replace the group data with a classification result.
    pub fn record_groups(&mut self, table: &GroupTable) {
        self.group_data = table
            .iter()
            .map(|record| {
                let group = GroupSettings {
                    embed: record.embed,
                    dimension: record.dimension,
                    size: record.size,
                };
                (record.name.clone(), group)
            })
            .collect();
    }
}
