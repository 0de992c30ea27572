//! Node identities.
//!
//! An identity is a pure function of the path from the root, so it doubles as
//! a lookup key and as the addressable name of the node's resources.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{PointCloudError, Result};

/// Identity of an octree cell.
pub trait NodeKey: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
  /// Identity of the tree root.
  fn root() -> Self;

  /// Distance from the root (root = 0).
  fn depth(&self) -> u32;

  /// Identity of the child in `octant`, numbered the way this key's layout
  /// numbers octants.
  fn child(&self, octant: u8) -> Result<Self>;
}

// =============================================================================
// EptKey - explicit hierarchy identity
// =============================================================================

/// `(depth, x, y, z)` identity rendered as `"{depth}-{x}-{y}-{z}"`.
///
/// Grid coordinates are at the key's own depth. Octants are numbered with
/// bit 0 = x, bit 1 = y, bit 2 = z, which gives the fixed child order
/// `(x,y,z), (x+1,y,z), (x,y+1,z), (x+1,y+1,z), (x,y,z+1), ...`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EptKey {
  pub depth: u32,
  pub x: u32,
  pub y: u32,
  pub z: u32,
}

impl EptKey {
  pub fn new(depth: u32, x: u32, y: u32, z: u32) -> Self {
    Self { depth, x, y, z }
  }

  /// Get parent key. `None` at the root.
  pub fn parent(&self) -> Option<Self> {
    if self.depth == 0 {
      return None;
    }
    Some(Self {
      depth: self.depth - 1,
      x: self.x >> 1,
      y: self.y >> 1,
      z: self.z >> 1,
    })
  }
}

impl NodeKey for EptKey {
  fn root() -> Self {
    Self::new(0, 0, 0, 0)
  }

  fn depth(&self) -> u32 {
    self.depth
  }

  fn child(&self, octant: u8) -> Result<Self> {
    if octant > 7 {
      return Err(PointCloudError::InvalidOctant(octant));
    }
    Ok(Self {
      depth: self.depth + 1,
      x: (self.x << 1) | (octant & 1) as u32,
      y: (self.y << 1) | ((octant >> 1) & 1) as u32,
      z: (self.z << 1) | ((octant >> 2) & 1) as u32,
    })
  }
}

impl fmt::Display for EptKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}-{}-{}", self.depth, self.x, self.y, self.z)
  }
}

impl FromStr for EptKey {
  type Err = PointCloudError;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || PointCloudError::InvalidKey(s.to_string());
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 4 {
      return Err(invalid());
    }
    let parse = |p: &str| p.parse::<u32>().map_err(|_| invalid());
    Ok(Self::new(
      parse(parts[0])?,
      parse(parts[1])?,
      parse(parts[2])?,
      parse(parts[3])?,
    ))
  }
}

// =============================================================================
// PathKey - implicit (bitfield) hierarchy identity
// =============================================================================

/// Path identity: `"r"` for the root, then one digit `0..=7` per level.
///
/// Length is always `depth + 1`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PathKey(String);

impl PathKey {
  pub const ROOT: &'static str = "r";

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Octant digits below the root, in order.
  pub fn octants(&self) -> impl Iterator<Item = u8> + '_ {
    self.0.bytes().skip(1).map(|b| b - b'0')
  }

  /// Octant of this node within its parent. `None` at the root.
  pub fn last_octant(&self) -> Option<u8> {
    self.octants().last()
  }

  pub fn parent(&self) -> Option<Self> {
    if self.0.len() <= 1 {
      return None;
    }
    Some(Self(self.0[..self.0.len() - 1].to_string()))
  }
}

impl NodeKey for PathKey {
  fn root() -> Self {
    Self(Self::ROOT.to_string())
  }

  fn depth(&self) -> u32 {
    (self.0.len() - 1) as u32
  }

  fn child(&self, octant: u8) -> Result<Self> {
    if octant > 7 {
      return Err(PointCloudError::InvalidOctant(octant));
    }
    let mut path = String::with_capacity(self.0.len() + 1);
    path.push_str(&self.0);
    path.push((b'0' + octant) as char);
    Ok(Self(path))
  }
}

impl fmt::Display for PathKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for PathKey {
  type Err = PointCloudError;

  fn from_str(s: &str) -> Result<Self> {
    let valid = s.starts_with(Self::ROOT) && s.bytes().skip(1).all(|b| (b'0'..=b'7').contains(&b));
    if !valid {
      return Err(PointCloudError::InvalidKey(s.to_string()));
    }
    Ok(Self(s.to_string()))
  }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
