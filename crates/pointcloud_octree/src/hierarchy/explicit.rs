//! Explicit hierarchy: per-chunk documents mapping identities to counts.
//!
//! A chunk covers a subtree rooted at the node it was fetched for. A count
//! of `-1` means the node exists but its own subtree lives in a separate
//! chunk; such nodes are created with an unresolved count so that loading
//! them later fetches that chunk.

use std::collections::{HashMap, VecDeque};

use crate::error::Result;
use crate::octree::{EptKey, NodeId, NodeKey, NodeLayout, PointCloudOctree};

/// Parsed hierarchy document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchyChunk {
  counts: HashMap<String, i64>,
}

impl HierarchyChunk {
  pub fn from_json(bytes: &[u8]) -> Result<Self> {
    let counts: HashMap<String, i64> = serde_json::from_slice(bytes)?;
    for key in counts.keys() {
      if key.parse::<EptKey>().is_err() {
        tracing::warn!(key = %key, "ignoring unparseable hierarchy key");
      }
    }
    Ok(Self { counts })
  }

  pub fn from_counts<K: ToString>(counts: impl IntoIterator<Item = (K, i64)>) -> Self {
    Self {
      counts: counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
  }

  pub fn get(&self, key: &str) -> Option<i64> {
    self.counts.get(key).copied()
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }
}

/// `-1` (and any other negative) leaves the count unresolved.
fn resolved(count: i64) -> Option<u64> {
  u64::try_from(count).ok()
}

impl<L: NodeLayout> PointCloudOctree<L> {
  /// Resolve `id` and the subtree described by `chunk`.
  ///
  /// Sets the node's own count, then walks breadth first from it: every
  /// octant whose identity appears in the chunk gets a child. Returns the
  /// number of nodes created.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "hierarchy::apply"))]
  pub fn apply_hierarchy(&mut self, id: NodeId, chunk: &HierarchyChunk) -> Result<usize> {
    let key = self.node(id)?.key().to_string();
    // A chunk always resolves its own root, even when it repeats a -1.
    let own = match chunk.get(&key) {
      Some(count) => resolved(count).unwrap_or(0),
      None => {
        tracing::warn!(key = %key, "hierarchy chunk does not list its own root");
        0
      }
    };
    self.set_num_points(id, Some(own))?;

    let mut created = 0;
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
      let parent_key = self.node(current)?.key().clone();
      for octant in 0..8u8 {
        let child_key = parent_key.child(octant)?;
        let Some(count) = chunk.get(&child_key.to_string()) else {
          continue;
        };
        let child = match self.find(&child_key) {
          Some(existing) => {
            if !self.node(existing)?.has_resolved_count() {
              self.set_num_points(existing, resolved(count))?;
            }
            existing
          }
          None => {
            created += 1;
            self.add(current, octant, resolved(count))?
          }
        };
        queue.push_back(child);
      }
    }

    tracing::debug!(key = %key, created, "applied hierarchy chunk");
    Ok(created)
  }
}

#[cfg(test)]
#[path = "explicit_test.rs"]
mod explicit_test;
