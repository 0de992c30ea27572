//! PointCloudOctree - arena owning every node of one dataset.
//!
//! The tree only grows: nodes are appended by [`PointCloudOctree::add`] and
//! are never removed, so a [`NodeId`] stays valid for the lifetime of the
//! tree.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use glam::{DQuat, DVec3};

use super::key::NodeKey;
use super::layout::NodeLayout;
use super::node::{Cached, NodeId, PointCloudNode};
use crate::crs::{CrsTransform, Wgs84Transform};
use crate::error::{PointCloudError, Result};
use crate::source::{NodeContext, SourceInfo};

pub struct PointCloudOctree<L: NodeLayout> {
  layout: L,
  info: SourceInfo,
  crs: Arc<dyn CrsTransform>,
  nodes: Vec<PointCloudNode<L::Key>>,
  index: HashMap<L::Key, NodeId>,
}

impl<L: NodeLayout> PointCloudOctree<L> {
  /// Tree holding only the root, whose point count is not resolved yet.
  pub fn new(layout: L, info: SourceInfo) -> Self {
    let voxel_obb = info.root_obb();
    let clamp_obb = voxel_obb.clamp_elevation(info.elevation);
    let root = PointCloudNode::new(L::Key::root(), None, None, None, voxel_obb, clamp_obb);

    let mut index = HashMap::new();
    index.insert(root.key.clone(), NodeId(0));

    Self {
      layout,
      info,
      crs: Arc::new(Wgs84Transform),
      nodes: vec![root],
      index,
    }
  }

  /// Replace the CRS capability used by [`Self::origin`] and [`Self::rotation`].
  pub fn with_crs_transform(mut self, crs: Arc<dyn CrsTransform>) -> Self {
    self.crs = crs;
    self
  }

  pub fn layout(&self) -> &L {
    &self.layout
  }

  pub fn info(&self) -> &SourceInfo {
    &self.info
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always false: the root exists from construction.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn get(&self, id: NodeId) -> Option<&PointCloudNode<L::Key>> {
    self.nodes.get(id.index())
  }

  pub fn node(&self, id: NodeId) -> Result<&PointCloudNode<L::Key>> {
    self.get(id).ok_or(PointCloudError::UnknownNode(id))
  }

  /// Mutable access, for the renderer-owned [`RenderState`](super::RenderState).
  pub fn node_mut(&mut self, id: NodeId) -> Result<&mut PointCloudNode<L::Key>> {
    self.nodes.get_mut(id.index()).ok_or(PointCloudError::UnknownNode(id))
  }

  pub fn find(&self, key: &L::Key) -> Option<NodeId> {
    self.index.get(key).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &PointCloudNode<L::Key>)> {
    self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i as u32), node))
  }

  // ===========================================================================
  // Growth
  // ===========================================================================

  /// Create the child of `parent` in `octant`.
  ///
  /// The child's voxel box is the parent's box subdivided along the axes the
  /// octant selects; its clamp box is that voxel box narrowed to the
  /// dataset's elevation range.
  pub fn add(&mut self, parent: NodeId, octant: u8, num_points: Option<u64>) -> Result<NodeId> {
    let parent_node = self.node(parent)?;
    let duplicate = parent_node
      .children
      .iter()
      .any(|c| self.nodes[c.index()].octant == Some(octant));
    if duplicate {
      return Err(PointCloudError::DuplicateOctant {
        parent: parent_node.key.to_string(),
        octant,
      });
    }

    let key = parent_node.key.child(octant)?;
    let axes = self.layout.octant_axes(&key, octant)?;
    let voxel_obb = parent_node.voxel_obb.subdivide(axes);
    let clamp_obb = voxel_obb.clamp_elevation(self.info.elevation);

    let id = NodeId(self.nodes.len() as u32);
    self.index.insert(key.clone(), id);
    self
      .nodes
      .push(PointCloudNode::new(key, Some(octant), num_points, Some(parent), voxel_obb, clamp_obb));
    self.nodes[parent.index()].children.push(id);
    Ok(id)
  }

  /// Existing child of `parent` in `octant`.
  pub fn child_in(&self, parent: NodeId, octant: u8) -> Option<NodeId> {
    let parent = self.get(parent)?;
    parent
      .children
      .iter()
      .copied()
      .find(|c| self.nodes[c.index()].octant == Some(octant))
  }

  pub(crate) fn set_num_points(&mut self, id: NodeId, num_points: Option<u64>) -> Result<()> {
    self.node_mut(id)?.num_points = num_points;
    Ok(())
  }

  // ===========================================================================
  // Derived values
  // ===========================================================================

  /// Dataset spacing halved once per level below the root.
  pub fn point_spacing(&self, id: NodeId) -> Result<f64> {
    let depth = self.node(id)?.depth();
    Ok(self.info.spacing / 2f64.powi(depth as i32))
  }

  /// True when the existence of the node's direct children is known.
  pub fn octree_is_loaded(&self, id: NodeId) -> Result<bool> {
    Ok(self.layout.octree_is_loaded(self.node(id)?))
  }

  /// World center of the node's clamp box. Computed once.
  pub fn center(&mut self, id: NodeId) -> Result<DVec3> {
    let node = self.node_mut(id)?;
    if let Some(center) = node.center.get() {
      return Ok(center);
    }
    let center = node.clamp_obb.world_center();
    node.center = Cached::Computed(center);
    Ok(center)
  }

  /// Center projected to zero elevation in the dataset CRS. Computed once;
  /// nothing is cached when the CRS capability fails.
  pub fn origin(&mut self, id: NodeId) -> Result<DVec3> {
    if let Some(origin) = self.node(id)?.origin.get() {
      return Ok(origin);
    }
    let center = self.center(id)?;
    let origin = self.crs.origin(&self.info.crs, center)?;
    self.node_mut(id)?.origin = Cached::Computed(origin);
    Ok(origin)
  }

  /// Rotation aligning local up with the vertical at [`Self::origin`].
  pub fn rotation(&mut self, id: NodeId) -> Result<DQuat> {
    if let Some(rotation) = self.node(id)?.rotation.get() {
      return Ok(rotation);
    }
    let origin = self.origin(id)?;
    let rotation = self.crs.rotation(&self.info.crs, origin)?;
    self.node_mut(id)?.rotation = Cached::Computed(rotation);
    Ok(rotation)
  }

  pub fn data_url(&self, id: NodeId) -> Result<String> {
    Ok(self.layout.data_url(&self.info, &self.node(id)?.key))
  }

  pub fn hierarchy_url(&self, id: NodeId) -> Result<Option<String>> {
    Ok(self.layout.hierarchy_url(&self.info, &self.node(id)?.key))
  }

  /// Owned snapshot of a node for payload parsers.
  pub fn context(&self, id: NodeId) -> Result<NodeContext> {
    let node = self.node(id)?;
    Ok(NodeContext {
      key: node.key.to_string(),
      depth: node.depth(),
      num_points: node.num_points,
      voxel_obb: node.voxel_obb,
      point_spacing: self.point_spacing(id)?,
    })
  }

  // ===========================================================================
  // Traversal
  // ===========================================================================

  /// Deepest node that is an ancestor-or-self of both `a` and `b`.
  ///
  /// Walks up from whichever node is deeper until both sit at the same depth,
  /// then steps both up together until the identities match.
  pub fn find_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
    let (mut a, mut b) = (a, b);
    loop {
      let (node_a, node_b) = (self.get(a)?, self.get(b)?);
      match node_a.depth().cmp(&node_b.depth()) {
        std::cmp::Ordering::Greater => a = node_a.parent?,
        std::cmp::Ordering::Less => b = node_b.parent?,
        std::cmp::Ordering::Equal => {
          if node_a.key == node_b.key {
            return Some(a);
          }
          a = node_a.parent?;
          b = node_b.parent?;
        }
      }
    }
  }

  /// Strict ancestors of `id`, nearest first.
  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let mut current = self.get(id).and_then(|n| n.parent);
    std::iter::from_fn(move || {
      let id = current?;
      current = self.nodes[id.index()].parent;
      Some(id)
    })
  }

  /// `id` and everything below it, breadth first.
  pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let mut queue: VecDeque<NodeId> = self.get(id).map(|_| id).into_iter().collect();
    std::iter::from_fn(move || {
      let id = queue.pop_front()?;
      queue.extend(self.nodes[id.index()].children.iter().copied());
      Some(id)
    })
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
