//! Group classification for embedding datasets.
//!
//! Inspects the named groups of a dataset and decides, per group, its
//! intrinsic dimension, its size and whether it should be embedded in the
//! host by default.
//!
//! # Default Embed Rule
//!
//! A group is embedded unless:
//!
//! - its name also names a group of the host (shared landmarks and fitting aids),
//! - it is empty,
//! - it is the designated marker group.
//!
//! Marker points are additionally grouped by their name into dimension-0
//! pseudo-groups. Flags from a previous classification always win, so a
//! user's explicit choice survives a reload.
//!
//! # Example
//!
//! ```
//! use embed_classify::{MarkerGroup, classify};
//! use embed_types::{Group, Model};
//! use hashbrown::HashMap;
//!
//! let mut data = Model::new();
//! data.add_datapoints([1, 2, 3]);
//! let mut points = Group::new("points");
//! points.add_datapoints([1, 2, 3]);
//! data.add_group(points).unwrap();
//!
//! let marker = MarkerGroup::discover(&data, "marker", None);
//! let table = classify(&data, std::iter::empty(), marker.as_ref(), &HashMap::new());
//! assert_eq!(table.get("points").map(|r| (r.dimension, r.size)), Some((0, 3)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod classify;
mod marker;
mod record;

pub use classify::classify;
pub use marker::{DEFAULT_MARKER_GROUP, MarkerGroup};
pub use record::{GroupOrigin, GroupRecord, GroupTable};
