//! NodeLayout - per-dataset-format behaviour injected into the shared octree.
//!
//! A layout decides how identities are formed, how an octant number maps to
//! a child volume, when a node's direct children are known, where resources
//! live, and how a node's local hierarchy is expanded.

use super::key::{EptKey, NodeKey, PathKey};
use super::node::{NodeId, PointCloudNode};
use super::tree::PointCloudOctree;
use crate::bounds::Octant;
use crate::error::{PointCloudError, Result};
use crate::hierarchy::HierarchyChunk;
use crate::source::{PotreeInfo, SourceInfo};

pub trait NodeLayout: Send + Sync + Sized + 'static {
  type Key: NodeKey;

  /// Axes selected by the child `key` created in `octant`.
  fn octant_axes(&self, key: &Self::Key, octant: u8) -> Result<Octant>;

  /// True when the existence of the node's direct children is known.
  fn octree_is_loaded(&self, node: &PointCloudNode<Self::Key>) -> bool;

  fn data_url(&self, info: &SourceInfo, key: &Self::Key) -> String;

  /// Document to fetch before the node can be expanded. `None` when the
  /// layout never fetches hierarchy documents itself.
  fn hierarchy_url(&self, info: &SourceInfo, key: &Self::Key) -> Option<String>;

  /// Resolve the local hierarchy below `id`. Returns the number of nodes
  /// created.
  fn expand(tree: &mut PointCloudOctree<Self>, id: NodeId, document: Option<&[u8]>) -> Result<usize>;
}

// =============================================================================
// EptLayout - explicit per-chunk hierarchy documents
// =============================================================================

/// Entwine Point Tile layout: `d-x-y-z` keys, JSON hierarchy chunks.
#[derive(Clone, Copy, Debug, Default)]
pub struct EptLayout;

impl NodeLayout for EptLayout {
  type Key = EptKey;

  /// The child's own coordinate parity says which half it occupies.
  fn octant_axes(&self, key: &EptKey, octant: u8) -> Result<Octant> {
    if octant > 7 {
      return Err(PointCloudError::InvalidOctant(octant));
    }
    Ok(Octant {
      x: key.x & 1 == 1,
      y: key.y & 1 == 1,
      z: key.z & 1 == 1,
    })
  }

  fn octree_is_loaded(&self, node: &PointCloudNode<EptKey>) -> bool {
    node.has_resolved_count()
  }

  fn data_url(&self, info: &SourceInfo, key: &EptKey) -> String {
    format!("{}/ept-data/{}.{}", info.base_url, key, info.extension)
  }

  fn hierarchy_url(&self, info: &SourceInfo, key: &EptKey) -> Option<String> {
    Some(format!("{}/ept-hierarchy/{}.json", info.base_url, key))
  }

  fn expand(tree: &mut PointCloudOctree<Self>, id: NodeId, document: Option<&[u8]>) -> Result<usize> {
    let document = document.ok_or_else(|| {
      PointCloudError::Parse("explicit hierarchy expansion needs a hierarchy document".into())
    })?;
    let chunk = HierarchyChunk::from_json(document)?;
    tree.apply_hierarchy(id, &chunk)
  }
}

// =============================================================================
// BitfieldLayout - occupancy carried by each node's own payload
// =============================================================================

/// Potree-style layout: `r0123` path keys, 8-bit child occupancy.
#[derive(Clone, Debug)]
pub struct BitfieldLayout {
  /// Directory below the dataset root holding the node files.
  pub octree_dir: String,
  /// Number of levels grouped in one directory / `.hrc` chunk.
  pub hierarchy_step_size: u32,
}

impl BitfieldLayout {
  pub fn new(octree_dir: impl Into<String>, hierarchy_step_size: u32) -> Self {
    Self {
      octree_dir: octree_dir.into(),
      hierarchy_step_size: hierarchy_step_size.max(1),
    }
  }

  pub fn from_info(info: &PotreeInfo) -> Self {
    Self::new(info.octree_dir.clone(), info.hierarchy_step_size)
  }

  /// `r/` followed by one directory per complete step of path digits.
  pub fn hierarchy_path(&self, key: &PathKey) -> String {
    let digits = &key.as_str()[1..];
    let step = self.hierarchy_step_size as usize;
    let mut path = String::from(PathKey::ROOT);
    for part in 0..digits.len() / step {
      path.push('/');
      path.push_str(&digits[part * step..(part + 1) * step]);
    }
    path
  }

  fn node_url(&self, info: &SourceInfo, key: &PathKey, extension: &str) -> String {
    let mut url = info.base_url.clone();
    if !self.octree_dir.is_empty() {
      url.push('/');
      url.push_str(&self.octree_dir);
    }
    format!("{}/{}/{}.{}", url, self.hierarchy_path(key), key, extension)
  }

  /// Location of the `.hrc` chunk rooted at `key`.
  pub fn hrc_url(&self, info: &SourceInfo, key: &PathKey) -> String {
    self.node_url(info, key, "hrc")
  }

  /// True when `key` starts a new `.hrc` chunk.
  pub fn is_chunk_root(&self, key: &PathKey) -> bool {
    key.depth() % self.hierarchy_step_size == 0
  }
}

impl Default for BitfieldLayout {
  fn default() -> Self {
    Self::new("data", 5)
  }
}

impl NodeLayout for BitfieldLayout {
  type Key = PathKey;

  fn octant_axes(&self, _key: &PathKey, octant: u8) -> Result<Octant> {
    Octant::from_index(octant)
  }

  /// Loaded unless the node claims children it does not have yet.
  fn octree_is_loaded(&self, node: &PointCloudNode<PathKey>) -> bool {
    !(!node.children_bitfield().is_empty() && node.children().is_empty())
  }

  fn data_url(&self, info: &SourceInfo, key: &PathKey) -> String {
    self.node_url(info, key, &info.extension)
  }

  fn hierarchy_url(&self, _info: &SourceInfo, _key: &PathKey) -> Option<String> {
    None
  }

  fn expand(tree: &mut PointCloudOctree<Self>, id: NodeId, _document: Option<&[u8]>) -> Result<usize> {
    tree.expand_bitfield(id)
  }
}
