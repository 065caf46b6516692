//! Coordinate field discovery by naming convention.

use embed_types::{FieldSet, Model};
use tracing::debug;

/// Finds the coordinate fields an embedding run works with.
pub trait FieldResolver {
    /// Find a coordinate field, preferring `name_hint`.
    ///
    /// With a `prefix`, field names are compared as if they started with
    /// `"<prefix> "`, and a matched field lacking the prefix is renamed so.
    /// Returns the name of the field found, if any.
    fn find_coordinates(&self, fields: &mut FieldSet, name_hint: Option<&str>, prefix: Option<&str>)
    -> Option<String>;

    /// Guess the material coordinates field of a host model.
    fn guess_material_coordinates(&self, model: &Model) -> Option<String>;
}

/// Field discovery following the scaffold naming conventions.
///
/// # Example
///
/// ```
/// use embedder::{ConventionFieldResolver, FieldResolver};
/// use embed_types::{CoordinateField, FieldSet};
///
/// let mut fields = FieldSet::new();
/// fields.add(CoordinateField::new("coordinates", 3).unwrap()).unwrap();
///
/// let found = ConventionFieldResolver.find_coordinates(&mut fields, None, Some("fitted"));
/// assert_eq!(found.as_deref(), Some("fitted coordinates"));
/// assert!(fields.contains("fitted coordinates"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionFieldResolver;

fn prefixed(name: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !name.starts_with(prefix) => format!("{prefix} {name}"),
        _ => name.to_string(),
    }
}

impl FieldResolver for ConventionFieldResolver {
    fn find_coordinates(
        &self,
        fields: &mut FieldSet,
        name_hint: Option<&str>,
        prefix: Option<&str>,
    ) -> Option<String> {
        let candidates: Vec<&str> = fields
            .coordinate_fields()
            .filter(|field| field.components() <= 3)
            .map(|field| field.name())
            .collect();
        let found = name_hint
            .and_then(|hint| {
                candidates
                    .iter()
                    .find(|name| prefixed(name, prefix) == hint)
            })
            .or_else(|| candidates.first())
            .map(|name| (*name).to_string())?;

        let name = prefixed(&found, prefix);
        if name != found {
            // the prefixed name can only be taken by a non-coordinate field
            if let Err(err) = fields.rename(&found, name.clone()) {
                debug!(field = %found, error = %err, "cannot prefix coordinate field name");
                return Some(found);
            }
        }
        if name_hint.is_some_and(|hint| hint != name) {
            debug!(hint = ?name_hint, found = %name, "coordinate field not found by name");
        }
        Some(name)
    }

    fn guess_material_coordinates(&self, model: &Model) -> Option<String> {
        let dimension = model.highest_dimension();
        let mut largest: Option<(&str, usize)> = None;
        for group in model.groups() {
            let size = group.element_count(dimension);
            if size > largest.map_or(0, |(_, best)| best) {
                largest = Some((group.name(), size));
            }
        }
        let name = format!("{} coordinates", largest?.0);
        model.fields().coordinates(&name).is_some().then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embed_types::{CoordinateField, Element, ElementShape, Group, StringField};

    fn fields(names: &[&str]) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.add(StringField::new("marker_name")).unwrap();
        for name in names {
            fields.add(CoordinateField::new(*name, 3).unwrap()).unwrap();
        }
        fields
    }

    #[test]
    fn test_hint_matched() {
        let mut set = fields(&["coordinates", "body coordinates"]);
        let found = ConventionFieldResolver.find_coordinates(&mut set, Some("body coordinates"), None);
        assert_eq!(found.as_deref(), Some("body coordinates"));
    }

    #[test]
    fn test_hint_missed_falls_back_to_first() {
        let mut set = fields(&["coordinates", "body coordinates"]);
        let found = ConventionFieldResolver.find_coordinates(&mut set, Some("xi"), None);
        assert_eq!(found.as_deref(), Some("coordinates"));
        let mut empty = fields(&[]);
        assert_eq!(ConventionFieldResolver.find_coordinates(&mut empty, None, None), None);
    }

    #[test]
    fn test_prefix_applied_to_comparison_and_name() {
        let mut set = fields(&["coordinates", "geometric coordinates"]);
        let found = ConventionFieldResolver.find_coordinates(
            &mut set,
            Some("fitted geometric coordinates"),
            Some("fitted"),
        );
        assert_eq!(found.as_deref(), Some("fitted geometric coordinates"));
        assert!(set.contains("fitted geometric coordinates"));
        assert!(set.contains("coordinates"));
    }

    #[test]
    fn test_prefix_not_doubled() {
        let mut set = fields(&["fitted coordinates"]);
        let found = ConventionFieldResolver.find_coordinates(&mut set, Some("fitted coordinates"), Some("fitted"));
        assert_eq!(found.as_deref(), Some("fitted coordinates"));
    }

    #[test]
    fn test_guess_material_from_largest_group() {
        let mut model = Model::new();
        model.add_nodes(1..=12);
        for (id, offset) in [(1, 0), (2, 4)] {
            let nodes: Vec<u32> = (1..=8).map(|n| n + offset).collect();
            model.add_element(Element::new(id, ElementShape::Cube, nodes).unwrap()).unwrap();
        }
        let mut body = Group::new("body");
        body.add_elements(3, [1, 2]);
        model.add_group(body).unwrap();
        let mut tip = Group::new("tip");
        tip.add_element(3, 2);
        model.add_group(tip).unwrap();
        assert_eq!(ConventionFieldResolver.guess_material_coordinates(&model), None);

        model
            .fields_mut()
            .add(CoordinateField::new("body coordinates", 3).unwrap())
            .unwrap();
        assert_eq!(
            ConventionFieldResolver.guess_material_coordinates(&model).as_deref(),
            Some("body coordinates")
        );
    }
}
