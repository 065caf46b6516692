//! Output assembly for embedded datasets.
//!
//! Builds the output of an embedding run: a filtered copy of the dataset
//! holding only the groups selected for embedding, with a regenerated
//! material coordinates field over every retained point.
//!
//! # Pipeline
//!
//! 1. [`RetainedSet::compute`] collects the members of every embedded group,
//!    materializing marker pseudo-groups from named marker points.
//! 2. [`assemble`] copies only those members, drops the other groups, and
//!    embeds every retained point through an
//!    [`EmbeddingMap`](embed_locate::EmbeddingMap).
//! 3. [`OutputCache`] keeps the result until something invalidates it.
//!
//! The output stores the host location of every point, so any host field can
//! be evaluated over the output for visualization
//! ([`OutputDataSet::host_coordinates`]).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod assemble;
mod error;
mod output;
mod retain;

pub use assemble::{AssemblyInput, HOST_LOCATION_FIELD, assemble};
pub use error::{AssembleError, AssembleResult};
pub use output::{AssemblyReport, OutputCache, OutputDataSet};
pub use retain::RetainedSet;

#[cfg(test)]
pub(crate) mod test_support {
    use embed_classify::{GroupTable, MarkerGroup, classify};
    use embed_locate::EmbeddingMap;
    use embed_types::{
        CoordinateField, Element, ElementShape, Group, MeshLocation, Model, Point3, PointKey,
        StringField,
    };
    use hashbrown::HashMap;

    /// Maps every point to element 1 of a 3-D host at `xi = point / 2`, with
    /// material coordinates equal to `xi`.
    pub struct HalfMap;

    impl EmbeddingMap for HalfMap {
        fn locate(&self, point: &Point3<f64>) -> Option<MeshLocation> {
            Some(MeshLocation {
                dimension: 3,
                element: 1,
                xi: point.coords * 0.5,
            })
        }

        fn material_at(&self, location: &MeshLocation) -> Option<Point3<f64>> {
            Some(Point3::from(location.xi))
        }

        fn material_components(&self) -> usize {
            3
        }
    }

    /// A unit cube (nodes 1-8) with its z=0 face, a line (nodes 9-10), four
    /// marker points (100 `tip 1`, 101 `tip 2`, 102 `tip 1`) and a loose point 103.
    ///
    /// Groups in order: `cube` (cube + face), `bottom` (face), `line`,
    /// `marker`, `points` (103). Marker points carry only `marker coordinates`.
    pub fn data_model() -> Model {
        let mut data = Model::new();
        let mut coordinates = CoordinateField::new("coordinates", 3).unwrap();
        for node in 1..=8 {
            data.add_node(node);
            let xi = ElementShape::Cube.node_xi(node as usize - 1);
            coordinates.set_point(PointKey::Node(node), Point3::from(xi));
        }
        data.add_nodes([9, 10]);
        coordinates.set_point(PointKey::Node(9), Point3::new(0.5, 0.5, 0.5));
        coordinates.set_point(PointKey::Node(10), Point3::new(3.0, 0.5, 0.5));
        data.add_element(Element::new(1, ElementShape::Cube, (1..=8).collect::<Vec<_>>()).unwrap())
            .unwrap();
        data.add_element(Element::new(1, ElementShape::Square, vec![1, 2, 3, 4]).unwrap())
            .unwrap();
        data.add_element(Element::new(1, ElementShape::Line, vec![9, 10]).unwrap())
            .unwrap();

        let mut marker_coordinates = CoordinateField::new("marker coordinates", 3).unwrap();
        let mut names = StringField::new("marker_name");
        for (id, name) in [(100, "tip 1"), (101, "tip 2"), (102, "tip 1")] {
            data.add_datapoint(id);
            marker_coordinates.set_point(PointKey::Datapoint(id), Point3::new(f64::from(id), 4.0, 0.0));
            names.set_value(PointKey::Datapoint(id), name);
        }
        data.add_datapoint(103);
        coordinates.set_point(PointKey::Datapoint(103), Point3::new(1.0, 1.0, 1.0));
        data.fields_mut().add(coordinates).unwrap();
        data.fields_mut().add(marker_coordinates).unwrap();
        data.fields_mut().add(names).unwrap();

        let mut cube = Group::new("cube");
        cube.add_element(3, 1);
        cube.add_element(2, 1);
        data.add_group(cube).unwrap();
        let mut bottom = Group::new("bottom");
        bottom.add_element(2, 1);
        data.add_group(bottom).unwrap();
        let mut line = Group::new("line");
        line.add_element(1, 1);
        data.add_group(line).unwrap();
        let mut marker = Group::new("marker");
        marker.add_datapoints([100, 101, 102]);
        data.add_group(marker).unwrap();
        let mut points = Group::new("points");
        points.add_datapoint(103);
        data.add_group(points).unwrap();
        data
    }

    /// Classify `data` and embed exactly the named groups.
    pub fn table_for(data: &Model, embedded: &[&str]) -> GroupTable {
        let marker = MarkerGroup::discover(data, "marker", Some("coordinates"));
        let mut table = classify(data, ["bottom"], marker.as_ref(), &HashMap::new());
        let names: Vec<String> = table.names().map(str::to_string).collect();
        for name in names {
            table.set_embed(&name, embedded.contains(&name.as_str()));
        }
        table
    }
}
