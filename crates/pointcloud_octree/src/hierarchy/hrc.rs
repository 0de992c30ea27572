//! Packed binary hierarchy chunks (`.hrc`).
//!
//! A chunk is a breadth-first list of 5-byte records, one per node of the
//! subtree it covers, starting with the chunk root:
//!
//! ```text
//! [u8 children bitfield][u32 LE point count]
//! ```
//!
//! Records after the root appear in the order of the set bits of the nodes
//! already visited. A zero count means "same as the chunk root".

use std::collections::VecDeque;

use super::ChildrenBitfield;
use crate::error::{PointCloudError, Result};
use crate::octree::{NodeId, NodeLayout, PointCloudOctree};

const RECORD_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HrcRecord {
  pub children: ChildrenBitfield,
  pub num_points: u32,
}

/// Decode every record of a chunk. Trailing bytes short of a full record are
/// ignored.
pub fn decode_hrc(bytes: &[u8]) -> Result<Vec<HrcRecord>> {
  if bytes.len() < RECORD_SIZE {
    return Err(PointCloudError::Parse(format!(
      "hierarchy chunk too short: {} bytes",
      bytes.len()
    )));
  }
  let trailing = bytes.len() % RECORD_SIZE;
  if trailing != 0 {
    tracing::warn!(trailing, "ignoring partial record at end of hierarchy chunk");
  }

  Ok(
    bytes
      .chunks_exact(RECORD_SIZE)
      .map(|record| HrcRecord {
        children: ChildrenBitfield(record[0]),
        num_points: u32::from_le_bytes([record[1], record[2], record[3], record[4]]),
      })
      .collect(),
  )
}

impl<L: NodeLayout> PointCloudOctree<L> {
  /// Apply a decoded chunk rooted at `id`: set counts and bitfields and
  /// create every node the chunk lists. Returns the number of nodes created.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "hierarchy::apply_hrc"))]
  pub fn apply_hrc(&mut self, id: NodeId, records: &[HrcRecord]) -> Result<usize> {
    let Some(root) = records.first() else {
      return Ok(0);
    };
    let root_count = u64::from(root.num_points);
    self.set_num_points(id, Some(root_count))?;
    self.set_children_bitfield(id, root.children)?;

    let mut remaining = records[1..].iter();
    let mut created = 0;
    let mut queue = VecDeque::from([id]);
    'walk: while let Some(current) = queue.pop_front() {
      let bitfield = self.node(current)?.children_bitfield();
      for octant in bitfield.octants() {
        let Some(record) = remaining.next() else {
          break 'walk;
        };
        let count = match record.num_points {
          0 => root_count,
          n => u64::from(n),
        };
        let child = match self.child_in(current, octant) {
          Some(existing) => existing,
          None => {
            created += 1;
            self.add(current, octant, None)?
          }
        };
        self.set_num_points(child, Some(count))?;
        self.set_children_bitfield(child, record.children)?;
        queue.push_back(child);
      }
    }

    if remaining.next().is_some() {
      tracing::warn!("hierarchy chunk has records past its last referenced node");
    }
    Ok(created)
  }
}

#[cfg(test)]
#[path = "hrc_test.rs"]
mod hrc_test;
