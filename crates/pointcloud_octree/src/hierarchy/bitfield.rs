//! Implicit hierarchy: a node's payload says which of its octants exist.

use crate::error::Result;
use crate::octree::{NodeId, NodeLayout, PointCloudOctree};

/// 8-bit occupancy mask; bit `i` set means octant `i` has a child.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ChildrenBitfield(pub u8);

impl ChildrenBitfield {
  pub const EMPTY: Self = Self(0);

  pub fn new(bits: u8) -> Self {
    Self(bits)
  }

  pub fn bits(self) -> u8 {
    self.0
  }

  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub fn contains(self, octant: u8) -> bool {
    octant < 8 && self.0 & (1 << octant) != 0
  }

  pub fn count(self) -> u32 {
    self.0.count_ones()
  }

  /// Set octants in ascending order.
  pub fn octants(self) -> impl Iterator<Item = u8> {
    (0u8..8).filter(move |&i| self.contains(i))
  }
}

impl<L: NodeLayout> PointCloudOctree<L> {
  pub fn set_children_bitfield(&mut self, id: NodeId, bitfield: ChildrenBitfield) -> Result<()> {
    self.node_mut(id)?.children_bitfield = bitfield;
    Ok(())
  }

  /// Create one child per set bit of the node's bitfield.
  ///
  /// Children that already exist are kept as they are, so expanding twice is
  /// a no-op. New children have no point count and an empty bitfield.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "hierarchy::expand_bitfield"))]
  pub fn expand_bitfield(&mut self, id: NodeId) -> Result<usize> {
    let bitfield = self.node(id)?.children_bitfield;
    let mut created = 0;
    for octant in bitfield.octants() {
      if self.child_in(id, octant).is_none() {
        self.add(id, octant, None)?;
        created += 1;
      }
    }
    Ok(created)
  }
}

#[cfg(test)]
#[path = "bitfield_test.rs"]
mod bitfield_test;
