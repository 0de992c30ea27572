use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::*;

// =========================================================================
// EptKey
// =========================================================================

#[test]
fn test_ept_key_format() {
  assert_eq!(EptKey::root().to_string(), "0-0-0-0");
  assert_eq!(EptKey::new(3, 5, 0, 7).to_string(), "3-5-0-7");
}

#[test]
fn test_ept_key_parse_roundtrip() {
  for key in [
    EptKey::root(),
    EptKey::new(1, 1, 0, 1),
    EptKey::new(12, 4095, 17, 2048),
  ] {
    let parsed: EptKey = key.to_string().parse().unwrap();
    assert_eq!(parsed, key);
  }
}

#[test]
fn test_ept_key_parse_rejects_garbage() {
  for bad in ["", "0-0-0", "0-0-0-0-0", "a-0-0-0", "1--0-0", "-1-0-0-0"] {
    assert!(
      matches!(bad.parse::<EptKey>(), Err(PointCloudError::InvalidKey(_))),
      "{bad:?} should not parse"
    );
  }
}

/// Children follow the fixed pattern (x,y,z), (x+1,y,z), (x,y+1,z), ...
#[test]
fn test_ept_key_child_order() {
  let parent = EptKey::new(2, 1, 2, 3);
  let expected = [
    (2, 4, 6),
    (3, 4, 6),
    (2, 5, 6),
    (3, 5, 6),
    (2, 4, 7),
    (3, 4, 7),
    (2, 5, 7),
    (3, 5, 7),
  ];

  for (octant, (x, y, z)) in expected.into_iter().enumerate() {
    let child = parent.child(octant as u8).unwrap();
    assert_eq!(child, EptKey::new(3, x, y, z), "octant {octant}");
    assert_eq!(child.parent(), Some(parent));
  }
}

#[test]
fn test_ept_key_child_rejects_bad_octant() {
  assert!(matches!(
    EptKey::root().child(8),
    Err(PointCloudError::InvalidOctant(8))
  ));
}

#[test]
fn test_ept_key_hash_consistency() {
  let hash = |key: &EptKey| {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
  };
  assert_eq!(hash(&EptKey::new(4, 1, 2, 3)), hash(&EptKey::new(4, 1, 2, 3)));
}

// =========================================================================
// PathKey
// =========================================================================

#[test]
fn test_path_key_root() {
  let root = PathKey::root();
  assert_eq!(root.as_str(), "r");
  assert_eq!(root.depth(), 0);
  assert_eq!(root.parent(), None);
  assert_eq!(root.last_octant(), None);
}

#[test]
fn test_path_key_structure() {
  let mut key = PathKey::root();
  for (level, octant) in [3u8, 0, 7, 5].into_iter().enumerate() {
    let child = key.child(octant).unwrap();
    assert!(child.as_str().starts_with(key.as_str()));
    assert_eq!(child.as_str().len(), key.as_str().len() + 1);
    assert_eq!(child.as_str().len() as u32, child.depth() + 1);
    assert_eq!(child.depth(), level as u32 + 1);
    assert_eq!(child.last_octant(), Some(octant));
    assert_eq!(child.parent().as_ref(), Some(&key));
    key = child;
  }
  assert_eq!(key.as_str(), "r3075");
  assert_eq!(key.octants().collect::<Vec<_>>(), vec![3, 0, 7, 5]);
}

#[test]
fn test_path_key_parse() {
  assert_eq!("r042".parse::<PathKey>().unwrap().depth(), 3);
  assert!("".parse::<PathKey>().is_err());
  assert!("x01".parse::<PathKey>().is_err());
  assert!("r08".parse::<PathKey>().is_err());
}
