//! Error type shared by every module of the crate.

use thiserror::Error;

use crate::octree::NodeId;

pub type Result<T> = std::result::Result<T, PointCloudError>;

#[derive(Error, Debug)]
pub enum PointCloudError {
  /// Octant indices live in `0..8`.
  #[error("octant index {0} is outside 0..8")]
  InvalidOctant(u8),

  #[error("node {parent} already has a child in octant {octant}")]
  DuplicateOctant { parent: String, octant: u8 },

  #[error("no node with id {0:?} in this octree")]
  UnknownNode(NodeId),

  #[error("invalid node key: {0}")]
  InvalidKey(String),

  #[error("invalid CRS: {0}")]
  InvalidCrs(String),

  #[error("fetch of {url} failed: {message}")]
  Fetch { url: String, message: String },

  #[error("payload parse failed: {0}")]
  Parse(String),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("invalid dataset metadata: {0}")]
  InvalidMetadata(String),

  /// A load worker panicked or went away without reporting a result.
  #[error("load worker failed: {0}")]
  WorkerPanicked(String),

  /// The owning layer abandoned the load before it finished.
  #[error("load cancelled")]
  Cancelled,
}
