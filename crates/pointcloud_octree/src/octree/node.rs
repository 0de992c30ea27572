//! PointCloudNode - one octree cell in the arena.
//!
//! Nodes never own each other directly: children and parent are [`NodeId`]
//! handles into the owning [`PointCloudOctree`](super::PointCloudOctree).

use glam::{DQuat, DVec3};
use smallvec::SmallVec;
use web_time::Instant;

use super::key::NodeKey;
use crate::bounds::Obb;
use crate::hierarchy::ChildrenBitfield;

/// Handle of a node inside its octree arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
  /// Get the raw arena index.
  pub fn raw(&self) -> u32 {
    self.0
  }

  pub(crate) fn index(self) -> usize {
    self.0 as usize
  }
}

/// Value computed on first use and kept forever.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Cached<T> {
  #[default]
  NotComputed,
  Computed(T),
}

impl<T: Copy> Cached<T> {
  pub fn get(&self) -> Option<T> {
    match self {
      Cached::NotComputed => None,
      Cached::Computed(value) => Some(*value),
    }
  }
}

/// Fields owned by the renderer. The octree only initializes them.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState {
  pub visible: bool,
  /// Screen-space error; negative until the renderer computes one.
  pub sse: f64,
  pub not_visible_since: Option<Instant>,
}

impl Default for RenderState {
  fn default() -> Self {
    Self {
      visible: false,
      sse: -1.0,
      not_visible_since: None,
    }
  }
}

/// Octree cell.
#[derive(Clone, Debug)]
pub struct PointCloudNode<K: NodeKey> {
  pub(crate) key: K,
  pub(crate) octant: Option<u8>,
  /// `None` until the hierarchy covering this node has been resolved.
  pub(crate) num_points: Option<u64>,
  pub(crate) children: SmallVec<[NodeId; 8]>,
  pub(crate) parent: Option<NodeId>,
  pub(crate) voxel_obb: Obb,
  pub(crate) clamp_obb: Obb,
  pub(crate) children_bitfield: ChildrenBitfield,
  pub(crate) center: Cached<DVec3>,
  pub(crate) origin: Cached<DVec3>,
  pub(crate) rotation: Cached<DQuat>,
  pub render: RenderState,
}

impl<K: NodeKey> PointCloudNode<K> {
  pub(crate) fn new(
    key: K,
    octant: Option<u8>,
    num_points: Option<u64>,
    parent: Option<NodeId>,
    voxel_obb: Obb,
    clamp_obb: Obb,
  ) -> Self {
    Self {
      key,
      octant,
      num_points,
      children: SmallVec::new(),
      parent,
      voxel_obb,
      clamp_obb,
      children_bitfield: ChildrenBitfield::EMPTY,
      center: Cached::NotComputed,
      origin: Cached::NotComputed,
      rotation: Cached::NotComputed,
      render: RenderState::default(),
    }
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  pub fn depth(&self) -> u32 {
    self.key.depth()
  }

  /// Octant within the parent, in the layout's own numbering.
  pub fn octant(&self) -> Option<u8> {
    self.octant
  }

  pub fn num_points(&self) -> Option<u64> {
    self.num_points
  }

  /// True once a point count is known (zero included).
  pub fn has_resolved_count(&self) -> bool {
    self.num_points.is_some()
  }

  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  pub fn voxel_obb(&self) -> &Obb {
    &self.voxel_obb
  }

  pub fn clamp_obb(&self) -> &Obb {
    &self.clamp_obb
  }

  pub fn children_bitfield(&self) -> ChildrenBitfield {
    self.children_bitfield
  }

  /// Cached world center, if already computed.
  pub fn cached_center(&self) -> Option<DVec3> {
    self.center.get()
  }

  pub fn cached_origin(&self) -> Option<DVec3> {
    self.origin.get()
  }

  pub fn cached_rotation(&self) -> Option<DQuat> {
    self.rotation.get()
  }
}
