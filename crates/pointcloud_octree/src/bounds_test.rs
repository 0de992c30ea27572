use super::*;

fn cube(min: f64, max: f64) -> DAabb3 {
  DAabb3::new(DVec3::splat(min), DVec3::splat(max))
}

// =========================================================================
// DAabb3 basics
// =========================================================================

#[test]
fn test_from_center_half_extents() {
  let aabb = DAabb3::from_center_half_extents(DVec3::ZERO, DVec3::splat(10.0));
  assert_eq!(aabb.min, DVec3::splat(-10.0));
  assert_eq!(aabb.max, DVec3::splat(10.0));
}

#[test]
fn test_from_array_layout() {
  let aabb = DAabb3::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
  assert_eq!(aabb.min, DVec3::new(1.0, 2.0, 3.0));
  assert_eq!(aabb.max, DVec3::new(4.0, 5.0, 6.0));
}

#[test]
fn test_contains_point() {
  let aabb = cube(0.0, 10.0);

  assert!(aabb.contains_point(DVec3::splat(5.0)));
  assert!(aabb.contains_point(DVec3::ZERO));
  assert!(aabb.contains_point(DVec3::splat(10.0)));
  assert!(!aabb.contains_point(DVec3::splat(-1.0)));
  assert!(!aabb.contains_point(DVec3::splat(11.0)));
}

#[test]
fn test_size_and_center() {
  let aabb = DAabb3::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0));
  assert_eq!(aabb.size(), DVec3::new(2.0, 4.0, 6.0));
  assert_eq!(aabb.center(), DVec3::ZERO);
  assert_eq!(aabb.volume(), 48.0);
}

// =========================================================================
// Octant decoding
// =========================================================================

#[test]
fn test_octant_bits() {
  // bit 2 = x, bit 1 = y, bit 0 = z
  let five = Octant::from_index(5).unwrap();
  assert_eq!(five, Octant { x: true, y: false, z: true });

  for i in 0u8..8 {
    assert_eq!(Octant::from_index(i).unwrap().index(), i);
  }
}

#[test]
fn test_all_octants_in_index_order() {
  let indices: Vec<u8> = Octant::all().map(Octant::index).collect();
  assert_eq!(indices, (0u8..8).collect::<Vec<_>>());
}

#[test]
fn test_octant_out_of_range() {
  assert!(matches!(
    Octant::from_index(8),
    Err(PointCloudError::InvalidOctant(8))
  ));
}

// =========================================================================
// Subdivision
// =========================================================================

#[test]
fn test_subdivide_concrete_octants() {
  let parent = cube(0.0, 8.0);

  let seven = parent.subdivide(Octant::from_index(7).unwrap());
  assert_eq!(seven.min, DVec3::splat(4.0));
  assert_eq!(seven.max, DVec3::splat(8.0));

  let zero = parent.subdivide(Octant::from_index(0).unwrap());
  assert_eq!(zero.min, DVec3::ZERO);
  assert_eq!(zero.max, DVec3::splat(4.0));

  let five = parent.subdivide(Octant::from_index(5).unwrap());
  assert_eq!(five.min, DVec3::new(4.0, 0.0, 4.0));
  assert_eq!(five.max, DVec3::new(8.0, 4.0, 8.0));
}

/// The eight children tile the parent: each is half-size, contained, the
/// volumes sum to the parent's and interiors never overlap.
#[test]
fn test_subdivide_partitions_parent() {
  let parent = DAabb3::new(DVec3::new(-3.0, 10.0, 0.5), DVec3::new(5.0, 22.0, 4.5));
  let children: Vec<DAabb3> = Octant::all().map(|o| parent.subdivide(o)).collect();

  let mut total = 0.0;
  for child in &children {
    assert!(parent.contains_aabb(child));
    assert_eq!(child.size(), parent.size() * 0.5);
    total += child.volume();
  }
  assert!((total - parent.volume()).abs() < 1e-9);

  for (i, a) in children.iter().enumerate() {
    for b in children.iter().skip(i + 1) {
      let overlap = a.min.max(b.min);
      let overlap_max = a.max.min(b.max);
      let extent = (overlap_max - overlap).max(DVec3::ZERO);
      assert_eq!(extent.x * extent.y * extent.z, 0.0, "{:?} overlaps {:?}", a, b);
    }
  }
}

// =========================================================================
// Elevation clamp
// =========================================================================

#[test]
fn test_clamp_concrete_example() {
  let child = DAabb3::new(DVec3::new(0.0, 0.0, 4.0), DVec3::new(4.0, 4.0, 8.0));
  let clamped = child.clamp_elevation(ElevationRange::new(2.0, 6.0));
  assert_eq!(clamped.min.z, 4.0);
  assert_eq!(clamped.max.z, 6.0);
  // Horizontal extent untouched.
  assert_eq!(clamped.min.x, child.min.x);
  assert_eq!(clamped.max.y, child.max.y);
}

#[test]
fn test_clamp_never_widens() {
  let ranges = [
    (2.0, 6.0),
    (-10.0, 100.0),
    (10.0, 12.0),
    (-5.0, -1.0),
    (3.0, 3.0),
    (0.0, 8.0),
  ];
  let boxes = [
    (0.0, 8.0),
    (4.0, 8.0),
    (-2.0, 1.0),
    (9.0, 15.0),
  ];

  for (zmin, zmax) in ranges {
    for (lo, hi) in boxes {
      let aabb = DAabb3::new(DVec3::new(0.0, 0.0, lo), DVec3::new(1.0, 1.0, hi));
      let clamped = aabb.clamp_elevation(ElevationRange::new(zmin, zmax));
      assert!(clamped.min.z >= aabb.min.z, "range {zmin}..{zmax} box {lo}..{hi}");
      assert!(clamped.max.z <= aabb.max.z, "range {zmin}..{zmax} box {lo}..{hi}");
      assert!(clamped.min.z <= clamped.max.z);
    }
  }
}

#[test]
fn test_clamp_unbounded_is_identity() {
  let aabb = cube(-4.0, 4.0);
  assert_eq!(aabb.clamp_elevation(ElevationRange::UNBOUNDED), aabb);
}

// =========================================================================
// Obb
// =========================================================================

#[test]
fn test_obb_children_inherit_placement() {
  let obb = Obb {
    local: cube(0.0, 8.0),
    position: DVec3::new(100.0, 0.0, 0.0),
    rotation: DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
  };
  let child = obb.subdivide(Octant::from_index(7).unwrap());
  assert_eq!(child.position, obb.position);
  assert_eq!(child.rotation, obb.rotation);
  assert_eq!(child.local.min, DVec3::splat(4.0));
}

#[test]
fn test_obb_world_center() {
  let obb = Obb {
    local: cube(0.0, 2.0),
    position: DVec3::new(10.0, 0.0, 0.0),
    rotation: DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
  };
  // Local center (1,1,1) rotated 90deg about z is (-1,1,1).
  let center = obb.world_center();
  assert!((center - DVec3::new(9.0, 1.0, 1.0)).length() < 1e-12);
}
