//! Dataset sources.
//!
//! A source describes a dataset (spacing, CRS, elevation range, URL layout)
//! and provides the two heavy capabilities the octree never implements
//! itself: fetching bytes and parsing point payloads.
//!
//! - [`ept`]: `ept.json` metadata (explicit hierarchy datasets)
//! - [`potree`]: `cloud.js` metadata (bitfield hierarchy datasets)
//! - [`directory`]: `DirectorySource`, a source backed by the local filesystem

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bounds::{DAabb3, ElevationRange, Obb};
use crate::error::{PointCloudError, Result};
use crate::hierarchy::ChildrenBitfield;

pub mod directory;
pub mod ept;
pub mod potree;

pub use directory::{DirectorySource, RawTile};
pub use ept::EptInfo;
pub use potree::PotreeInfo;

/// Reject a metadata box whose corners are inverted or not numbers.
pub(crate) fn check_box(field: &str, min: [f64; 3], max: [f64; 3]) -> Result<()> {
  // `!(a <= b)` also catches NaN
  if min.iter().zip(&max).any(|(lo, hi)| !(lo <= hi)) {
    return Err(PointCloudError::InvalidMetadata(format!(
      "{field} is inverted: min {min:?}, max {max:?}"
    )));
  }
  Ok(())
}

/// Static description of a dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
  /// Point spacing at depth 0, in dataset units.
  pub spacing: f64,
  /// CRS of the dataset coordinates, e.g. `"EPSG:4978"`.
  pub crs: String,
  /// Real vertical extent of the points.
  pub elevation: ElevationRange,
  /// Cubic box enclosing the whole dataset (root voxel box).
  pub root_bounds: DAabb3,
  /// Location of the dataset; resource URLs are built below it.
  pub base_url: String,
  /// Extension of point payload files (`laz`, `bin`, ...).
  pub extension: String,
}

impl SourceInfo {
  /// Unrotated root volume at the dataset's own coordinates.
  pub fn root_obb(&self) -> Obb {
    Obb::from_aabb(self.root_bounds)
  }
}

/// Transport configuration handed to [`PointCloudSource::fetch`] untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
  pub headers: BTreeMap<String, String>,
  pub timeout_ms: Option<u64>,
}

/// Snapshot of a node handed to the payload parser.
///
/// Parsing runs on worker threads, so the parser gets a copy rather than a
/// reference into the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeContext {
  pub key: String,
  pub depth: u32,
  pub num_points: Option<u64>,
  pub voxel_obb: Obb,
  pub point_spacing: f64,
}

/// Parsed point payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload<G> {
  pub geometry: G,
  /// Child occupancy carried by the payload itself (bitfield hierarchies).
  pub children_bitfield: Option<ChildrenBitfield>,
}

impl<G> Payload<G> {
  pub fn new(geometry: G) -> Self {
    Self {
      geometry,
      children_bitfield: None,
    }
  }

  pub fn with_children(geometry: G, children_bitfield: ChildrenBitfield) -> Self {
    Self {
      geometry,
      children_bitfield: Some(children_bitfield),
    }
  }
}

/// Capability consumed by the octree loaders.
///
/// `fetch` and `parse` are blocking; the asynchronous loader runs them on
/// rayon worker threads.
pub trait PointCloudSource: Send + Sync + 'static {
  type Geometry: Send + Sync + 'static;

  fn info(&self) -> &SourceInfo;

  fn network_options(&self) -> &NetworkOptions;

  fn fetch(&self, url: &str, options: &NetworkOptions) -> Result<Vec<u8>>;

  fn parse(&self, bytes: Vec<u8>, node: &NodeContext) -> Result<Payload<Self::Geometry>>;
}
