//! Bounding volumes for octree cells.
//!
//! A cell's volume is an axis-aligned box expressed in a local frame, placed in
//! the world by a position and a rotation ([`Obb`]). Subdivision and the
//! elevation clamp both operate on the local box; the placement is inherited
//! unchanged by every descendant.

use glam::{DQuat, DVec3};

use crate::error::{PointCloudError, Result};

/// Double-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl DAabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Create a new AABB from center and half-extents.
  pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  /// Build from the `[xmin, ymin, zmin, xmax, ymax, zmax]` layout used by
  /// dataset metadata files.
  pub fn from_array(bounds: [f64; 6]) -> Self {
    Self::new(
      DVec3::new(bounds[0], bounds[1], bounds[2]),
      DVec3::new(bounds[3], bounds[4], bounds[5]),
    )
  }

  /// Check if this AABB contains a point.
  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// True if `other` lies entirely inside this box (boundaries may touch).
  #[inline]
  pub fn contains_aabb(&self, other: &DAabb3) -> bool {
    other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }

  #[inline]
  pub fn volume(&self) -> f64 {
    let size = self.size();
    size.x * size.y * size.z
  }

  /// Octant of this box selected by `octant`.
  ///
  /// Starts from the minimum-corner octant (`max = center`) and shifts both
  /// corners by the half-extent along every axis the octant selects. The 8
  /// results tile the parent exactly, each with half its extent per axis.
  pub fn subdivide(&self, octant: Octant) -> DAabb3 {
    let center = self.center();
    let half = center - self.min;
    let shift = DVec3::new(
      if octant.x { half.x } else { 0.0 },
      if octant.y { half.y } else { 0.0 },
      if octant.z { half.z } else { 0.0 },
    );
    DAabb3 {
      min: self.min + shift,
      max: center + shift,
    }
  }

  /// Narrow the vertical extent toward `range`. Never widens the box.
  pub fn clamp_elevation(&self, range: ElevationRange) -> DAabb3 {
    let mut clamped = *self;
    if self.min.z < range.zmax {
      clamped.max.z = clamped.max.z.min(range.zmax);
    }
    if clamped.max.z > range.zmin {
      clamped.min.z = clamped.min.z.max(range.zmin);
    }
    clamped
  }
}

/// One of the eight children of a cell, as per-axis "upper half" flags.
///
/// Each hierarchy layout numbers octants its own way; they all decode into
/// this form before any geometry is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Octant {
  pub x: bool,
  pub y: bool,
  pub z: bool,
}

impl Octant {
  /// Decode the bitfield numbering: bit 2 = x, bit 1 = y, bit 0 = z.
  pub fn from_index(index: u8) -> Result<Self> {
    if index > 7 {
      return Err(PointCloudError::InvalidOctant(index));
    }
    Ok(Self {
      x: index & 0b100 != 0,
      y: index & 0b010 != 0,
      z: index & 0b001 != 0,
    })
  }

  /// Inverse of [`Octant::from_index`].
  pub fn index(self) -> u8 {
    ((self.x as u8) << 2) | ((self.y as u8) << 1) | (self.z as u8)
  }

  /// Iterate all eight octants in index order.
  pub fn all() -> impl Iterator<Item = Octant> {
    (0u8..8).filter_map(|i| Self::from_index(i).ok())
  }
}

/// Real vertical extent of the dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElevationRange {
  pub zmin: f64,
  pub zmax: f64,
}

impl ElevationRange {
  pub fn new(zmin: f64, zmax: f64) -> Self {
    debug_assert!(zmin <= zmax, "zmin must be <= zmax");
    Self { zmin, zmax }
  }

  /// A range that never narrows anything.
  pub const UNBOUNDED: Self = Self {
    zmin: f64::NEG_INFINITY,
    zmax: f64::INFINITY,
  };
}

/// Oriented bounding box: a local AABB placed by `position` and `rotation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
  pub local: DAabb3,
  pub position: DVec3,
  pub rotation: DQuat,
}

impl Obb {
  /// Unrotated box at the world origin.
  pub fn from_aabb(local: DAabb3) -> Self {
    Self {
      local,
      position: DVec3::ZERO,
      rotation: DQuat::IDENTITY,
    }
  }

  /// Child volume; placement is inherited from the parent.
  pub fn subdivide(&self, octant: Octant) -> Obb {
    Obb {
      local: self.local.subdivide(octant),
      ..*self
    }
  }

  pub fn clamp_elevation(&self, range: ElevationRange) -> Obb {
    Obb {
      local: self.local.clamp_elevation(range),
      ..*self
    }
  }

  /// World-space position of the box center.
  pub fn world_center(&self) -> DVec3 {
    self.position + self.rotation * self.local.center()
  }
}

#[cfg(test)]
#[path = "bounds_test.rs"]
mod bounds_test;
