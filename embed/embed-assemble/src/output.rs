//! The assembled output and its cache.

use embed_types::{CoordinateField, Field, MeshLocationField, Model};

/// What happened while assembling an output dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Name the material coordinates were written under.
    pub material_field: String,
    /// The host material field name, if it collided and was replaced.
    pub renamed_from: Option<String>,
    /// Name of the stored host location field.
    pub location_field: String,
    /// Embedded marker pseudo-groups that could not be materialized.
    pub skipped_marker_groups: Vec<String>,
    /// Retained points without coordinates or without a material value.
    pub unresolved_points: usize,
    /// Retained elements over all dimensions.
    pub retained_elements: usize,
    /// Retained nodes.
    pub retained_nodes: usize,
    /// Retained datapoints.
    pub retained_datapoints: usize,
}

/// A filtered copy of a dataset carrying material coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDataSet {
    model: Model,
    report: AssemblyReport,
}

impl OutputDataSet {
    pub(crate) fn new(model: Model, report: AssemblyReport) -> Self {
        Self { model, report }
    }

    /// The output model.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Consume into the output model.
    #[must_use]
    pub fn into_model(self) -> Model {
        self.model
    }

    /// Assembly report.
    #[must_use]
    pub const fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// The generated material coordinates field.
    #[must_use]
    pub fn material_coordinates(&self) -> Option<&CoordinateField> {
        self.model.fields().coordinates(&self.report.material_field)
    }

    /// Host mesh locations of every resolved point.
    #[must_use]
    pub fn host_locations(&self) -> Option<&MeshLocationField> {
        match self.model.fields().get(&self.report.location_field)? {
            Field::MeshLocation(field) => Some(field),
            _ => None,
        }
    }

    /// Evaluate a host coordinate field at every stored host location.
    ///
    /// With the host's fitted field this places the output back in fitted
    /// space for visualization. Returns `None` if either field is missing.
    #[must_use]
    pub fn host_coordinates(&self, host: &Model, field_name: &str) -> Option<CoordinateField> {
        let host_field = host.fields().coordinates(field_name)?;
        let locations = self.host_locations()?;
        let mut values = CoordinateField::new(field_name, host_field.components()).ok()?;
        for (key, location) in locations.iter() {
            let value = host
                .element(location.dimension, location.element)
                .and_then(|element| host_field.evaluate(element, &location.xi));
            if let Some(value) = value {
                values.set_point(key, value);
            }
        }
        Some(values)
    }
}

/// Lazily regenerated output: dirty until generated, clean until invalidated.
///
/// # Example
///
/// ```
/// use embed_assemble::OutputCache;
///
/// let mut cache = OutputCache::new();
/// assert!(cache.is_dirty());
/// cache.invalidate();
/// assert!(cache.get().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputCache {
    output: Option<OutputDataSet>,
}

impl OutputCache {
    /// Create a dirty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the output must be regenerated.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.output.is_none()
    }

    /// Discard the cached output.
    pub fn invalidate(&mut self) {
        self.output = None;
    }

    /// The cached output, if clean.
    #[must_use]
    pub const fn get(&self) -> Option<&OutputDataSet> {
        self.output.as_ref()
    }

    /// Return the cached output, generating it first if dirty.
    ///
    /// # Errors
    ///
    /// Returns the error of `generate`; the cache stays dirty.
    pub fn get_or_try_generate<E>(
        &mut self,
        generate: impl FnOnce() -> Result<OutputDataSet, E>,
    ) -> Result<&OutputDataSet, E> {
        let output = match self.output.take() {
            Some(output) => output,
            None => generate()?,
        };
        Ok(self.output.insert(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_clean_until_invalidated() {
        let mut cache = OutputCache::new();
        let mut calls = 0;
        let mut generate = || -> Result<OutputDataSet, ()> {
            calls += 1;
            Ok(OutputDataSet::new(Model::new(), AssemblyReport::default()))
        };
        assert!(cache.get_or_try_generate(&mut generate).is_ok());
        assert!(!cache.is_dirty());
        assert!(cache.get_or_try_generate(&mut generate).is_ok());
        cache.invalidate();
        assert!(cache.is_dirty());
        assert!(cache.get_or_try_generate(&mut generate).is_ok());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_failed_generation_stays_dirty() {
        let mut cache = OutputCache::new();
        assert!(cache.get_or_try_generate(|| Err("no map")).is_err());
        assert!(cache.is_dirty());
    }
}
