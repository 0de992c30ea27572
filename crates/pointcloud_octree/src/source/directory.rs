//! DirectorySource - dataset served from the local filesystem.
//!
//! URLs are read as paths (an optional `file://` prefix is stripped). Point
//! payloads are not decoded; the raw bytes are the geometry.

use std::path::Path;

use super::{ept, potree, EptInfo, NetworkOptions, NodeContext, Payload, PointCloudSource, PotreeInfo, SourceInfo};
use crate::error::{PointCloudError, Result};

/// Undecoded payload bytes of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTile {
  pub key: String,
  pub bytes: Vec<u8>,
}

pub struct DirectorySource {
  info: SourceInfo,
  network: NetworkOptions,
}

impl DirectorySource {
  pub fn new(info: SourceInfo, network: NetworkOptions) -> Self {
    Self { info, network }
  }

  /// Open an EPT dataset from the directory containing `ept.json`.
  pub fn open_ept(dir: impl AsRef<Path>, network: NetworkOptions) -> Result<(Self, EptInfo)> {
    let dir = dir.as_ref();
    let text = std::fs::read_to_string(dir.join(ept::METADATA_FILE))?;
    let metadata = EptInfo::from_json(&text)?;
    let info = metadata.source_info(&dir.to_string_lossy())?;
    Ok((Self::new(info, network), metadata))
  }

  /// Open a Potree 1.x dataset from the directory containing `cloud.js`.
  pub fn open_potree(
    dir: impl AsRef<Path>,
    crs: Option<&str>,
    network: NetworkOptions,
  ) -> Result<(Self, PotreeInfo)> {
    let dir = dir.as_ref();
    let text = std::fs::read_to_string(dir.join(potree::METADATA_FILE))?;
    let metadata = PotreeInfo::from_json(&text)?;
    let info = metadata.source_info(&dir.to_string_lossy(), crs)?;
    Ok((Self::new(info, network), metadata))
  }
}

impl PointCloudSource for DirectorySource {
  type Geometry = RawTile;

  fn info(&self) -> &SourceInfo {
    &self.info
  }

  fn network_options(&self) -> &NetworkOptions {
    &self.network
  }

  fn fetch(&self, url: &str, _options: &NetworkOptions) -> Result<Vec<u8>> {
    let path = url.strip_prefix("file://").unwrap_or(url);
    std::fs::read(path).map_err(|e| PointCloudError::Fetch {
      url: url.to_string(),
      message: e.to_string(),
    })
  }

  fn parse(&self, bytes: Vec<u8>, node: &NodeContext) -> Result<Payload<RawTile>> {
    Ok(Payload::new(RawTile {
      key: node.key.clone(),
      bytes,
    }))
  }
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::PathBuf;

  use super::*;
  use crate::loader::load;
  use crate::octree::{EptLayout, PointCloudOctree};

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pointcloud_octree_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("ept-hierarchy")).unwrap();
    fs::create_dir_all(dir.join("ept-data")).unwrap();
    dir
  }

  #[test]
  fn test_open_and_load_ept_directory() {
    let dir = scratch_dir("ept");
    fs::write(
      dir.join("ept.json"),
      r#"{"bounds": [0, 0, 0, 16, 16, 16], "points": 12, "span": 16,
          "dataType": "binary", "hierarchyType": "json",
          "srs": {"authority": "EPSG", "horizontal": "3946"}}"#,
    )
    .unwrap();
    fs::write(dir.join("ept-hierarchy/0-0-0-0.json"), r#"{"0-0-0-0": 12, "1-1-1-1": 5}"#).unwrap();
    fs::write(dir.join("ept-data/0-0-0-0.bin"), [7u8; 12]).unwrap();

    let (source, metadata) = DirectorySource::open_ept(&dir, NetworkOptions::default()).unwrap();
    assert_eq!(metadata.points, 12);
    assert_eq!(source.info().crs, "EPSG:3946");
    assert_eq!(source.info().extension, "bin");

    let mut tree = PointCloudOctree::new(EptLayout, source.info().clone());
    let root = tree.root();
    let tile = load(&mut tree, root, &source).unwrap();
    assert_eq!(tile.key, "0-0-0-0");
    assert_eq!(tile.bytes.len(), 12);
    assert_eq!(tree.len(), 2);

    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_missing_file_is_fetch_error() {
    let source = DirectorySource::new(crate::test_utils::cube_info(), NetworkOptions::default());
    assert!(matches!(
      source.fetch("file:///definitely/not/here.bin", source.network_options()),
      Err(PointCloudError::Fetch { .. })
    ));
  }

  #[test]
  fn test_open_rejects_inverted_bounds() {
    let dir = scratch_dir("inverted");
    fs::write(
      dir.join("ept.json"),
      r#"{"bounds": [0, 0, 50, 100, 100, -50], "points": 1, "span": 16,
          "dataType": "binary", "hierarchyType": "json"}"#,
    )
    .unwrap();
    assert!(matches!(
      DirectorySource::open_ept(&dir, NetworkOptions::default()),
      Err(PointCloudError::InvalidMetadata(_))
    ));
    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_open_missing_metadata() {
    let dir = scratch_dir("empty");
    assert!(matches!(
      DirectorySource::open_ept(&dir, NetworkOptions::default()),
      Err(PointCloudError::Io(_))
    ));
    let _ = fs::remove_dir_all(&dir);
  }
}
