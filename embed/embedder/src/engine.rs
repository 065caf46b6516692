//! The embedding engine.

use std::mem;

use embed_assemble::{AssemblyInput, AssemblyReport, OutputCache, OutputDataSet, assemble};
use embed_classify::{DEFAULT_MARKER_GROUP, GroupRecord, GroupTable, MarkerGroup};
use embed_locate::{FittedDomain, LocationResolver, ResolverParams};
use embed_types::{CoordinateField, Model};
use tracing::info;

use crate::error::{EmbedderError, EmbedderResult};
use crate::resolver::{ConventionFieldResolver, FieldResolver};
use crate::settings::EmbedderSettings;
use crate::source::{ModelInput, ModelSource};

/// Prefix marking the fitted coordinates field on the merged host.
pub const FITTED_PREFIX: &str = "fitted";

/// Reports a degraded condition: `warn!` when diagnostics are enabled,
/// `debug!` otherwise.
macro_rules! diagnostic {
    ($level:expr, $($arg:tt)+) => {
        if $level > 0 {
            tracing::warn!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Lifecycle state of a [`DataEmbedder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderState {
    /// No models loaded.
    Unloaded,
    /// Models loaded and fields resolved, groups not classified.
    Loaded,
    /// Groups classified; output must be generated.
    Classified,
    /// Output generated and current.
    Assembled,
}

/// Loaded models and the fields resolved on them.
struct Session {
    host: Model,
    data: Model,
    fitted_field: Option<String>,
    material_field: Option<String>,
    data_field: Option<String>,
    marker: Option<MarkerGroup>,
    map: Option<LocationResolver>,
}

enum Stage {
    Unloaded,
    Loaded(Box<Session>),
    Classified {
        session: Box<Session>,
        groups: GroupTable,
        output: OutputCache,
    },
}

impl Stage {
    fn session(&self) -> Option<&Session> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(session) | Self::Classified { session, .. } => Some(session),
        }
    }

    fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(session) | Self::Classified { session, .. } => Some(session),
        }
    }

    /// Mark the output dirty, optionally dropping the embedding map.
    fn invalidate(&mut self, drop_map: bool) {
        match self {
            Self::Unloaded => {}
            Self::Loaded(session) => {
                if drop_map {
                    session.map = None;
                }
            }
            Self::Classified { session, output, .. } => {
                if drop_map {
                    session.map = None;
                }
                output.invalidate();
            }
        }
    }
}

/// Embeds a dataset captured in fitted space into a host's material coordinates.
///
/// The engine moves through `Unloaded -> Loaded -> Classified -> Assembled`:
///
/// - [`load_models`](Self::load_models) reads the fitted geometry, scaffold
///   and data models and resolves their coordinate fields.
/// - [`classify`](Self::classify) rebuilds the group table, keeping embed flags.
/// - [`generate_output`](Self::generate_output) assembles the output, or
///   returns the cached one.
///
/// Every setter that changes what the output depends on moves an assembled
/// engine back to `Classified`.
///
/// # Example
///
/// ```no_run
/// use embedder::{DataEmbedder, InMemorySource};
/// # use embed_types::Model;
/// # let (scaffold, fitted, data) = (Model::new(), Model::new(), Model::new());
///
/// let source = InMemorySource::new()
///     .with_scaffold(scaffold)
///     .with_fitted_geometry(fitted)
///     .with_data(data);
/// let mut embedder = DataEmbedder::new(source);
/// embedder.load()?;
/// embedder.group_set_embed("landmarks", false);
/// let output = embedder.generate_output()?;
/// println!("{:?}", output.report());
/// # Ok::<(), embedder::EmbedderError>(())
/// ```
pub struct DataEmbedder<S: ModelSource, R: FieldResolver = ConventionFieldResolver> {
    source: S,
    fields: R,
    settings: EmbedderSettings,
    params: ResolverParams,
    stage: Stage,
}

impl<S: ModelSource> DataEmbedder<S> {
    /// Create an engine with conventional field discovery.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_field_resolver(source, ConventionFieldResolver)
    }
}

impl<S: ModelSource, R: FieldResolver> DataEmbedder<S, R> {
    /// Create an engine with a custom field resolver.
    #[must_use]
    pub fn with_field_resolver(source: S, fields: R) -> Self {
        Self {
            source,
            fields,
            settings: EmbedderSettings::default(),
            params: ResolverParams::default(),
            stage: Stage::Unloaded,
        }
    }

    /// Set location search parameters.
    #[must_use]
    pub fn with_resolver_params(mut self, params: ResolverParams) -> Self {
        self.params = params;
        self.stage.invalidate(true);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EmbedderState {
        match &self.stage {
            Stage::Unloaded => EmbedderState::Unloaded,
            Stage::Loaded(_) => EmbedderState::Loaded,
            Stage::Classified { output, .. } if output.is_dirty() => EmbedderState::Classified,
            Stage::Classified { .. } => EmbedderState::Assembled,
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Current settings, including resolved field names and group data.
    #[must_use]
    pub const fn settings(&self) -> &EmbedderSettings {
        &self.settings
    }

    /// Replace the settings. The engine is unloaded; call [`load`](Self::load)
    /// to apply them.
    pub fn apply_settings(&mut self, settings: EmbedderSettings) {
        self.settings = settings;
        self.stage = Stage::Unloaded;
    }

    /// Replace the settings from JSON, unloading the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::Settings`] if the JSON is malformed; the
    /// engine is left unchanged.
    pub fn decode_settings_json(&mut self, json: &str) -> EmbedderResult<()> {
        let settings = EmbedderSettings::from_json(json)?;
        self.apply_settings(settings);
        Ok(())
    }

    /// Encode the current settings as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::Settings`] if serialization fails.
    pub fn encode_settings_json(&self) -> EmbedderResult<String> {
        self.settings.to_json()
    }

    /// Diagnostic verbosity.
    #[must_use]
    pub const fn diagnostic_level(&self) -> u32 {
        self.settings.diagnostic_level
    }

    /// Set diagnostic verbosity; above 0, degraded conditions are logged as warnings.
    pub fn set_diagnostic_level(&mut self, level: u32) {
        self.settings.diagnostic_level = level;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the models and resolve their coordinate fields.
    ///
    /// The fitted geometry is read first and its coordinate field renamed with
    /// the `fitted` prefix, then the scaffold is merged into the same host.
    /// Any previous state is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::Load`] naming the model that failed; the
    /// engine is left unloaded.
    pub fn load_models(&mut self) -> EmbedderResult<()> {
        self.stage = Stage::Unloaded;
        let session = self.read_session()?;
        info!(
            host_dimension = session.host.highest_dimension(),
            host_groups = session.host.groups().count(),
            data_groups = session.data.groups().count(),
            marker = ?session.marker.as_ref().map(MarkerGroup::name),
            "Loaded models"
        );
        self.stage = Stage::Loaded(Box::new(session));
        Ok(())
    }

    /// Classify the dataset groups, keeping the current embed flags.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::InvalidState`] if no models are loaded.
    pub fn classify(&mut self) -> EmbedderResult<()> {
        let session = match mem::replace(&mut self.stage, Stage::Unloaded) {
            Stage::Unloaded => {
                return Err(EmbedderError::InvalidState {
                    operation: "classify",
                    state: EmbedderState::Unloaded,
                });
            }
            Stage::Loaded(session) | Stage::Classified { session, .. } => session,
        };
        let groups = embed_classify::classify(
            &session.data,
            session.host.group_names(),
            session.marker.as_ref(),
            &self.settings.embed_flags(),
        );
        self.settings.record_groups(&groups);
        self.stage = Stage::Classified {
            session,
            groups,
            output: OutputCache::new(),
        };
        Ok(())
    }

    /// Load the models and classify their groups.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::Load`] if a model cannot be loaded.
    pub fn load(&mut self) -> EmbedderResult<()> {
        self.load_models()?;
        self.classify()
    }

    /// Generate the output, or return it unchanged if nothing changed since
    /// the last generation.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::InvalidState`] before classification, an
    /// `*Unavailable` error if a needed coordinate field was not found, or
    /// the error of building the embedding map.
    pub fn generate_output(&mut self) -> EmbedderResult<&OutputDataSet> {
        let state = self.state();
        let level = self.settings.diagnostic_level;
        let params = self.params;
        let projection = self.settings.projection_group.as_deref();
        let Stage::Classified {
            session,
            groups,
            output,
        } = &mut self.stage
        else {
            return Err(EmbedderError::InvalidState {
                operation: "generate output",
                state,
            });
        };

        output.get_or_try_generate(|| {
            let data_field = session
                .data_field
                .as_deref()
                .ok_or(EmbedderError::DataCoordinatesUnavailable)?;
            let map = match session.map.take() {
                Some(map) => map,
                None => build_map(
                    &session.host,
                    session.fitted_field.as_deref(),
                    session.material_field.as_deref(),
                    projection,
                    params,
                )?,
            };
            let map = &*session.map.insert(map);

            let input = AssemblyInput {
                dataset: &session.data,
                groups,
                marker: session.marker.as_ref(),
                data_coordinates: data_field,
                material_field: map.material_field_name(),
            };
            let result = assemble(&input, map)?;
            report_assembly(level, result.report());
            Ok(result)
        })
    }

    /// The generated output, if current.
    #[must_use]
    pub fn output(&self) -> Option<&OutputDataSet> {
        match &self.stage {
            Stage::Classified { output, .. } => output.get(),
            _ => None,
        }
    }

    /// Material coordinates field of the current output.
    #[must_use]
    pub fn output_material_coordinates_field(&self) -> Option<&CoordinateField> {
        self.output()?.material_coordinates()
    }

    /// A host field evaluated over the current output, by default the fitted
    /// coordinates, for viewing the output in host space.
    #[must_use]
    pub fn output_host_coordinates_field(&self, field: Option<&str>) -> Option<CoordinateField> {
        let session = self.stage.session()?;
        let field = field.or(session.fitted_field.as_deref())?;
        self.output()?.host_coordinates(&session.host, field)
    }

    /// The merged host model.
    #[must_use]
    pub fn host_model(&self) -> Option<&Model> {
        self.stage.session().map(|session| &session.host)
    }

    /// The dataset.
    #[must_use]
    pub fn data_model(&self) -> Option<&Model> {
        self.stage.session().map(|session| &session.data)
    }

    // =========================================================================
    // Fields and groups
    // =========================================================================

    /// Data coordinates field name, once loaded.
    #[must_use]
    pub fn data_coordinates_field(&self) -> Option<&str> {
        self.stage.session()?.data_field.as_deref()
    }

    /// Use another dataset coordinate field. Before loading, the name is
    /// kept as a hint for the next load.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::FieldNotFound`] if the dataset has no
    /// coordinate field of that name.
    pub fn set_data_coordinates_field(&mut self, name: &str) -> EmbedderResult<()> {
        if let Some(session) = self.stage.session_mut() {
            require_coordinates(&session.data, name)?;
            session.data_field = Some(name.to_string());
            // marker points default to the data coordinates
            if let Some(marker) = &session.marker {
                session.marker = MarkerGroup::discover(&session.data, marker.name(), Some(name));
            }
        }
        self.settings.data_coordinates_field = Some(name.to_string());
        self.stage.invalidate(false);
        Ok(())
    }

    /// Fitted coordinates field name, once loaded.
    #[must_use]
    pub fn fitted_coordinates_field(&self) -> Option<&str> {
        self.stage.session()?.fitted_field.as_deref()
    }

    /// Use another host field as fitted coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::FieldNotFound`] if the host has no coordinate
    /// field of that name.
    pub fn set_fitted_coordinates_field(&mut self, name: &str) -> EmbedderResult<()> {
        if let Some(session) = self.stage.session_mut() {
            require_coordinates(&session.host, name)?;
            session.fitted_field = Some(name.to_string());
        }
        self.settings.fitted_coordinates_field = Some(name.to_string());
        self.stage.invalidate(true);
        Ok(())
    }

    /// Material coordinates field name, once loaded.
    #[must_use]
    pub fn material_coordinates_field(&self) -> Option<&str> {
        self.stage.session()?.material_field.as_deref()
    }

    /// Use another host field as material coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::FieldNotFound`] if the host has no coordinate
    /// field of that name.
    pub fn set_material_coordinates_field(&mut self, name: &str) -> EmbedderResult<()> {
        if let Some(session) = self.stage.session_mut() {
            require_coordinates(&session.host, name)?;
            session.material_field = Some(name.to_string());
        }
        self.settings.material_coordinates_field = Some(name.to_string());
        self.stage.invalidate(true);
        Ok(())
    }

    /// Host group all locations are restricted to.
    #[must_use]
    pub fn projection_group(&self) -> Option<&str> {
        self.settings.projection_group.as_deref()
    }

    /// Restrict locations to a host group, or lift the restriction.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::GroupNotFound`] if the host has no such group.
    pub fn set_projection_group(&mut self, name: Option<&str>) -> EmbedderResult<()> {
        if let (Some(session), Some(name)) = (self.stage.session(), name) {
            if !session.host.has_group(name) {
                return Err(EmbedderError::GroupNotFound {
                    name: name.to_string(),
                });
            }
        }
        self.settings.projection_group = name.map(str::to_string);
        self.stage.invalidate(true);
        Ok(())
    }

    /// Marker group name, once loaded and found.
    #[must_use]
    pub fn data_marker_group(&self) -> Option<&str> {
        self.stage
            .session()?
            .marker
            .as_ref()
            .map(MarkerGroup::name)
    }

    /// Use another dataset group as the marker group, or none. Classified
    /// groups are reclassified, keeping their embed flags.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedderError::GroupNotFound`] if the dataset has no such group.
    pub fn set_data_marker_group(&mut self, name: Option<&str>) -> EmbedderResult<()> {
        if let Some(session) = self.stage.session_mut() {
            session.marker = match name {
                Some(name) => {
                    let marker = MarkerGroup::discover(&session.data, name, session.data_field.as_deref())
                        .ok_or_else(|| EmbedderError::GroupNotFound {
                            name: name.to_string(),
                        })?;
                    Some(marker)
                }
                None => None,
            };
            if let Some(marker) = &session.marker {
                report_marker(self.settings.diagnostic_level, marker);
            }
        }
        self.settings.data_marker_group = name.map(str::to_string);
        if matches!(self.stage, Stage::Classified { .. }) {
            self.classify()?;
        }
        Ok(())
    }

    /// Classified group names in order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups().into_iter().flat_map(GroupTable::names)
    }

    /// Check whether a classified group exists.
    #[must_use]
    pub fn group_exists(&self, name: &str) -> bool {
        self.groups().is_some_and(|groups| groups.contains(name))
    }

    /// Dimension of a group; 0 for unknown groups.
    #[must_use]
    pub fn group_dimension(&self, name: &str) -> usize {
        self.record(name, "dimension").map_or(0, |record| record.dimension)
    }

    /// Size of a group; 0 for unknown groups.
    #[must_use]
    pub fn group_size(&self, name: &str) -> usize {
        self.record(name, "size").map_or(0, |record| record.size)
    }

    /// Whether a group is embedded; `false` for unknown groups.
    #[must_use]
    pub fn group_is_embed(&self, name: &str) -> bool {
        self.record(name, "embed").is_some_and(|record| record.embed)
    }

    /// Set whether a group is embedded. Returns `false` for unknown groups.
    pub fn group_set_embed(&mut self, name: &str, embed: bool) -> bool {
        let level = self.settings.diagnostic_level;
        let Stage::Classified { groups, output, .. } = &mut self.stage else {
            diagnostic!(level, group = name, "cannot set embed flag before classification");
            return false;
        };
        if !groups.set_embed(name, embed) {
            diagnostic!(level, group = name, "no group of name");
            return false;
        }
        if let Some(saved) = self.settings.group_data.get_mut(name) {
            saved.embed = embed;
        }
        output.invalidate();
        true
    }

    fn groups(&self) -> Option<&GroupTable> {
        match &self.stage {
            Stage::Classified { groups, .. } => Some(groups),
            _ => None,
        }
    }

    fn record(&self, name: &str, query: &str) -> Option<&GroupRecord> {
        let record = self.groups().and_then(|groups| groups.get(name));
        if record.is_none() {
            diagnostic!(self.settings.diagnostic_level, group = name, query, "no group of name");
        }
        record
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn read_session(&mut self) -> EmbedderResult<Session> {
        let level = self.settings.diagnostic_level;
        let load = |input| {
            self.source
                .load(input)
                .map_err(|source| EmbedderError::Load { input, source })
        };

        let mut host = load(ModelInput::FittedGeometry)?;
        let fitted_hint = self.settings.fitted_coordinates_field.clone();
        let fitted_field =
            self.fields
                .find_coordinates(host.fields_mut(), fitted_hint.as_deref(), Some(FITTED_PREFIX));

        let scaffold = load(ModelInput::Scaffold)?;
        let conflicts = host.merge(&scaffold);
        if !conflicts.is_empty() {
            diagnostic!(level, ?conflicts, "scaffold fields clash with fitted geometry fields");
        }
        let material_hint = self
            .settings
            .material_coordinates_field
            .clone()
            .or_else(|| self.fields.guess_material_coordinates(&host));
        let material_field = self
            .fields
            .find_coordinates(host.fields_mut(), material_hint.as_deref(), None);

        let mut data = load(ModelInput::Data)?;
        let data_hint = self.settings.data_coordinates_field.clone();
        let data_field = self
            .fields
            .find_coordinates(data.fields_mut(), data_hint.as_deref(), None);

        for (role, hint, found) in [
            ("fitted", &fitted_hint, &fitted_field),
            ("material", &material_hint, &material_field),
            ("data", &data_hint, &data_field),
        ] {
            match (hint, found) {
                (_, None) => diagnostic!(level, role, "no coordinate field found"),
                (Some(hint), Some(found)) if hint != found => {
                    diagnostic!(level, role, hint = %hint, found = %found, "coordinate field not found by name");
                }
                _ => {}
            }
        }

        let marker_name = self
            .settings
            .data_marker_group
            .clone()
            .unwrap_or_else(|| DEFAULT_MARKER_GROUP.to_string());
        let marker = MarkerGroup::discover(&data, &marker_name, data_field.as_deref());
        if let Some(marker) = &marker {
            report_marker(level, marker);
        }

        if let Some(projection) = &self.settings.projection_group {
            if !host.has_group(projection) {
                diagnostic!(level, group = %projection, "projection group not in host, ignored");
                self.settings.projection_group = None;
            }
        }

        if fitted_field.is_some() {
            self.settings.fitted_coordinates_field.clone_from(&fitted_field);
        }
        if material_field.is_some() {
            self.settings.material_coordinates_field.clone_from(&material_field);
        }
        if data_field.is_some() {
            self.settings.data_coordinates_field.clone_from(&data_field);
        }
        self.settings.data_marker_group = marker.as_ref().map(|marker| marker.name().to_string());

        Ok(Session {
            host,
            data,
            fitted_field,
            material_field,
            data_field,
            marker,
            map: None,
        })
    }
}

fn require_coordinates(model: &Model, name: &str) -> EmbedderResult<()> {
    if model.fields().coordinates(name).is_some() {
        Ok(())
    } else {
        Err(EmbedderError::FieldNotFound {
            name: name.to_string(),
        })
    }
}

fn build_map(
    host: &Model,
    fitted: Option<&str>,
    material: Option<&str>,
    projection: Option<&str>,
    params: ResolverParams,
) -> EmbedderResult<LocationResolver> {
    let fitted = fitted
        .and_then(|name| host.fields().coordinates(name))
        .ok_or(EmbedderError::FittedCoordinatesUnavailable)?;
    let material = material
        .and_then(|name| host.fields().coordinates(name))
        .ok_or(EmbedderError::MaterialCoordinatesUnavailable)?;
    let projection = projection
        .map(|name| {
            host.group(name).ok_or_else(|| EmbedderError::GroupNotFound {
                name: name.to_string(),
            })
        })
        .transpose()?;
    let domain = FittedDomain::new(host, fitted, projection)?;
    Ok(LocationResolver::new(&domain, fitted, material, params)?)
}

fn report_marker(level: u32, marker: &MarkerGroup) {
    if !marker.is_complete() {
        diagnostic!(
            level,
            group = marker.name(),
            "data marker group is empty or has no coordinates or name field"
        );
    }
}

fn report_assembly(level: u32, report: &AssemblyReport) {
    if let Some(original) = &report.renamed_from {
        diagnostic!(
            level,
            field = %original,
            renamed = %report.material_field,
            "material coordinates field name already used in data, renamed"
        );
    }
    for group in &report.skipped_marker_groups {
        diagnostic!(level, group = %group, "cannot materialize marker group, skipped");
    }
    if report.unresolved_points > 0 {
        diagnostic!(
            level,
            points = report.unresolved_points,
            "points without data coordinates or material value"
        );
    }
    info!(
        material_field = %report.material_field,
        elements = report.retained_elements,
        nodes = report.retained_nodes,
        datapoints = report.retained_datapoints,
        "Generated output"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;
    use embed_types::{Element, ElementShape, Group, Point3, PointKey};

    /// A host line from x=0 to x=2 in fitted space, 0..1 in material space,
    /// and three datapoints: 1 and 2 in group `points`, 3 in group `body`.
    fn line_source() -> InMemorySource {
        let line = || {
            let mut model = Model::new();
            model.add_nodes([1, 2]);
            model
                .add_element(Element::new(1, ElementShape::Line, vec![1, 2]).unwrap())
                .unwrap();
            let mut body = Group::new("body");
            body.add_element(1, 1);
            model.add_group(body).unwrap();
            model
        };

        let mut scaffold = line();
        let mut material = CoordinateField::new("body coordinates", 1).unwrap();
        material.set_value(PointKey::Node(1), &[0.0]).unwrap();
        material.set_value(PointKey::Node(2), &[1.0]).unwrap();
        let mut geometry = CoordinateField::new("coordinates", 3).unwrap();
        geometry.set_point(PointKey::Node(1), Point3::new(0.0, 0.0, 0.0));
        geometry.set_point(PointKey::Node(2), Point3::new(1.0, 0.0, 0.0));
        scaffold.fields_mut().add(geometry).unwrap();
        scaffold.fields_mut().add(material).unwrap();

        let mut fitted = line();
        let mut fitted_geometry = CoordinateField::new("coordinates", 3).unwrap();
        fitted_geometry.set_point(PointKey::Node(1), Point3::new(0.0, 0.0, 0.0));
        fitted_geometry.set_point(PointKey::Node(2), Point3::new(2.0, 0.0, 0.0));
        fitted.fields_mut().add(fitted_geometry).unwrap();

        let mut data = Model::new();
        data.add_datapoints([1, 2, 3]);
        let mut coordinates = CoordinateField::new("coordinates", 3).unwrap();
        coordinates.set_point(PointKey::Datapoint(1), Point3::new(1.0, 0.0, 0.0));
        coordinates.set_point(PointKey::Datapoint(2), Point3::new(0.5, 1.0, 0.0));
        coordinates.set_point(PointKey::Datapoint(3), Point3::new(3.0, 0.0, 0.0));
        data.fields_mut().add(coordinates).unwrap();
        let mut points = Group::new("points");
        points.add_datapoints([1, 2]);
        data.add_group(points).unwrap();
        let mut body = Group::new("body");
        body.add_datapoint(3);
        data.add_group(body).unwrap();

        InMemorySource::new()
            .with_scaffold(scaffold)
            .with_fitted_geometry(fitted)
            .with_data(data)
    }

    #[test]
    fn test_fields_resolved_on_load() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        assert_eq!(embedder.fitted_coordinates_field(), Some("fitted coordinates"));
        assert_eq!(embedder.material_coordinates_field(), Some("body coordinates"));
        assert_eq!(embedder.data_coordinates_field(), Some("coordinates"));
        assert_eq!(embedder.data_marker_group(), None);
        assert_eq!(
            embedder.settings().fitted_coordinates_field.as_deref(),
            Some("fitted coordinates")
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut embedder = DataEmbedder::new(line_source());
        assert_eq!(embedder.state(), EmbedderState::Unloaded);
        embedder.load_models().unwrap();
        assert_eq!(embedder.state(), EmbedderState::Loaded);
        assert!(matches!(
            embedder.generate_output(),
            Err(EmbedderError::InvalidState { .. })
        ));
        embedder.classify().unwrap();
        assert_eq!(embedder.state(), EmbedderState::Classified);
        embedder.generate_output().unwrap();
        assert_eq!(embedder.state(), EmbedderState::Assembled);
        assert!(embedder.group_set_embed("body", true));
        assert_eq!(embedder.state(), EmbedderState::Classified);
        assert!(embedder.output().is_none());
    }

    #[test]
    fn test_classify_requires_models() {
        let mut embedder = DataEmbedder::new(line_source());
        assert!(matches!(
            embedder.classify(),
            Err(EmbedderError::InvalidState {
                state: EmbedderState::Unloaded,
                ..
            })
        ));
    }

    #[test]
    fn test_generate_is_cached() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        let first = embedder.generate_output().unwrap().clone();
        let second = embedder.generate_output().unwrap();
        assert_eq!(&first, second);
    }

    #[test]
    fn test_output_material_values() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        assert!(embedder.group_is_embed("points"));
        assert!(!embedder.group_is_embed("body"));
        embedder.generate_output().unwrap();

        let material = embedder.output_material_coordinates_field().unwrap();
        assert_eq!(material.name(), "body coordinates");
        assert_eq!(material.len(), 2);
        assert_relative_eq!(material.value(PointKey::Datapoint(1)).unwrap().x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(material.value(PointKey::Datapoint(2)).unwrap().x, 0.25, epsilon = 1e-9);

        let host = embedder.output_host_coordinates_field(None).unwrap();
        assert_relative_eq!(host.value(PointKey::Datapoint(1)).unwrap().x, 1.0, epsilon = 1e-9);
        assert!(embedder.output_host_coordinates_field(Some("missing")).is_none());
    }

    #[test]
    fn test_load_failure_leaves_engine_unloaded() {
        let source = InMemorySource::new().with_fitted_geometry(Model::new());
        let mut embedder = DataEmbedder::new(source);
        let err = embedder.load().unwrap_err();
        assert!(matches!(
            err,
            EmbedderError::Load {
                input: ModelInput::Scaffold,
                ..
            }
        ));
        assert_eq!(embedder.state(), EmbedderState::Unloaded);
    }

    #[test]
    fn test_unknown_group_defaults() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.set_diagnostic_level(1);
        assert!(!embedder.group_set_embed("points", false));
        embedder.load().unwrap();
        assert!(!embedder.group_exists("nope"));
        assert_eq!(embedder.group_dimension("nope"), 0);
        assert_eq!(embedder.group_size("nope"), 0);
        assert!(!embedder.group_is_embed("nope"));
        assert!(!embedder.group_set_embed("nope", true));
        assert_eq!(embedder.group_names().collect::<Vec<_>>(), ["body", "points"]);
    }

    #[test]
    fn test_embed_flag_survives_settings_round_trip() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        assert!(embedder.group_set_embed("points", false));
        assert!(embedder.group_set_embed("body", true));
        let json = embedder.encode_settings_json().unwrap();

        let mut restored = DataEmbedder::new(line_source());
        restored.decode_settings_json(&json).unwrap();
        restored.load().unwrap();
        assert!(!restored.group_is_embed("points"));
        assert!(restored.group_is_embed("body"));
    }

    #[test]
    fn test_reload_keeps_flags() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        embedder.group_set_embed("points", false);
        embedder.load().unwrap();
        assert!(!embedder.group_is_embed("points"));
    }

    #[test]
    fn test_setters_validate_names() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.set_projection_group(Some("anything")).unwrap();
        embedder.load().unwrap();
        // unknown projection group from settings is dropped on load
        assert_eq!(embedder.projection_group(), None);

        assert!(matches!(
            embedder.set_projection_group(Some("nope")),
            Err(EmbedderError::GroupNotFound { .. })
        ));
        assert!(matches!(
            embedder.set_material_coordinates_field("nope"),
            Err(EmbedderError::FieldNotFound { .. })
        ));
        assert!(matches!(
            embedder.set_data_marker_group(Some("nope")),
            Err(EmbedderError::GroupNotFound { .. })
        ));
        embedder.set_projection_group(Some("body")).unwrap();
        embedder.generate_output().unwrap();
        embedder.set_fitted_coordinates_field("coordinates").unwrap();
        assert_eq!(embedder.state(), EmbedderState::Classified);
    }

    #[test]
    fn test_marker_group_change_reclassifies() {
        let mut embedder = DataEmbedder::new(line_source());
        embedder.load().unwrap();
        assert!(embedder.group_is_embed("points"));
        embedder.group_set_embed("points", true);
        embedder.set_data_marker_group(Some("points")).unwrap();
        assert_eq!(embedder.data_marker_group(), Some("points"));
        // the flag set before is kept although "points" is now the marker group
        assert!(embedder.group_is_embed("points"));
        assert_eq!(embedder.state(), EmbedderState::Classified);
    }

    #[test]
    fn test_missing_data_coordinates_unavailable() {
        let source = line_source();
        let mut data = source.load(ModelInput::Data).unwrap();
        data.fields_mut().remove("coordinates");
        let source = source.with_data(data);
        let mut embedder = DataEmbedder::new(source);
        embedder.load().unwrap();
        assert_eq!(embedder.data_coordinates_field(), None);
        assert!(matches!(
            embedder.generate_output(),
            Err(EmbedderError::DataCoordinatesUnavailable)
        ));
    }
}
