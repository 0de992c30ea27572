//! pointcloud_octree - lazily materialized point-cloud octree
//!
//! Large point clouds are served as a hierarchy of octree nodes, each holding
//! a subset of the points at a given level of detail. Nodes are only created
//! when a hierarchy description says they exist, and are only filled when a
//! renderer asks for their payload.
//!
//! # Features
//!
//! - **Bounding volumes**: exact octant subdivision plus an elevation clamp
//!   that narrows each node box to the dataset's real vertical extent
//! - **Node arena**: nodes addressed by [`NodeId`], identities resolved by
//!   key, lazily cached placement (center, origin, rotation)
//! - **Two hierarchy layouts**: explicit per-chunk JSON documents (EPT) and
//!   per-node child bitfields (Potree)
//! - **Non-blocking loads**: fetch/parse on rayon workers, one load in flight
//!   per node, cancellation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pointcloud_octree::{DirectorySource, EptLayout, NetworkOptions, NodeLoader, PointCloudOctree};
//!
//! let (source, _) = DirectorySource::open_ept("data/cloud", NetworkOptions::default())?;
//! let source = Arc::new(source);
//! let mut tree = PointCloudOctree::new(EptLayout, source.info().clone());
//! let mut loader = NodeLoader::new(source);
//!
//! let root = tree.root();
//! loader.request(&mut tree, root)?;
//! loop {
//!   for event in loader.poll(&mut tree) {
//!     println!("{event:?}");
//!   }
//!   if loader.is_idle() { break; }
//! }
//! ```

pub mod bounds;
pub mod config;
pub mod crs;
pub mod error;
pub mod hierarchy;
pub mod loader;
pub mod octree;
pub mod source;

#[cfg(test)]
pub mod test_utils;

pub use bounds::{DAabb3, ElevationRange, Obb, Octant};
pub use config::{DatasetFormat, PointCloudConfig};
pub use crs::{CrsTransform, Wgs84Transform};
pub use error::{PointCloudError, Result};
pub use hierarchy::{decode_hrc, ChildrenBitfield, HierarchyChunk, HrcRecord};
pub use loader::{load, load_octree, CancelToken, LoadEvent, LoadState, LoaderStats, NodeLoader, RequestOutcome};
pub use octree::{
  BitfieldLayout, Cached, EptKey, EptLayout, NodeId, NodeKey, NodeLayout, PathKey, PointCloudNode,
  PointCloudOctree, RenderState,
};
pub use source::{
  DirectorySource, EptInfo, NetworkOptions, NodeContext, Payload, PointCloudSource, PotreeInfo, RawTile,
  SourceInfo,
};
