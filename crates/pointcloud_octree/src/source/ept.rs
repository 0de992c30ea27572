//! EPT (Entwine Point Tile) dataset metadata.

use serde::Deserialize;

use super::{check_box, SourceInfo};
use crate::bounds::{DAabb3, ElevationRange};
use crate::error::{PointCloudError, Result};

/// Name of the metadata document at the dataset root.
pub const METADATA_FILE: &str = "ept.json";

/// Spatial reference block of `ept.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EptSrs {
  pub authority: Option<String>,
  pub horizontal: Option<String>,
  pub vertical: Option<String>,
  pub wkt: Option<String>,
}

/// Dataset info from `ept.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct EptInfo {
  /// Cubic bounds `[xmin, ymin, zmin, xmax, ymax, zmax]`.
  pub bounds: [f64; 6],
  /// Tight bounds of the actual points.
  #[serde(rename = "boundsConforming")]
  pub bounds_conforming: Option<[f64; 6]>,
  pub points: u64,
  /// Grid resolution of each node along one axis.
  pub span: u32,
  #[serde(rename = "dataType")]
  pub data_type: String,
  #[serde(rename = "hierarchyType")]
  pub hierarchy_type: String,
  pub srs: Option<EptSrs>,
}

impl EptInfo {
  pub fn from_json(text: &str) -> Result<Self> {
    let info: EptInfo = serde_json::from_str(text)?;
    if info.span == 0 {
      return Err(PointCloudError::InvalidMetadata("span must be positive".into()));
    }
    check_bounds("bounds", &info.bounds)?;
    if let Some(conforming) = &info.bounds_conforming {
      check_bounds("boundsConforming", conforming)?;
    }
    if info.hierarchy_type != "json" {
      return Err(PointCloudError::InvalidMetadata(format!(
        "unsupported hierarchyType: {}",
        info.hierarchy_type
      )));
    }
    Ok(info)
  }

  /// Payload file extension for `dataType`.
  pub fn extension(&self) -> Result<&'static str> {
    match self.data_type.as_str() {
      "laszip" => Ok("laz"),
      "binary" => Ok("bin"),
      "zstandard" => Ok("zst"),
      other => Err(PointCloudError::InvalidMetadata(format!(
        "unsupported dataType: {other}"
      ))),
    }
  }

  /// `"{authority}:{horizontal}"`, geocentric when no srs is given.
  pub fn crs(&self) -> String {
    match &self.srs {
      Some(EptSrs {
        authority: Some(authority),
        horizontal: Some(horizontal),
        ..
      }) => format!("{authority}:{horizontal}"),
      _ => "EPSG:4978".to_string(),
    }
  }

  /// Average of the x and y extents divided by the node span.
  pub fn spacing(&self) -> f64 {
    let b = &self.bounds;
    ((b[3] - b[0]).abs() + (b[4] - b[1]).abs()) / (2.0 * self.span as f64)
  }

  pub fn elevation(&self) -> ElevationRange {
    let b = self.bounds_conforming.as_ref().unwrap_or(&self.bounds);
    ElevationRange::new(b[2], b[5])
  }

  pub fn source_info(&self, base_url: &str) -> Result<SourceInfo> {
    Ok(SourceInfo {
      spacing: self.spacing(),
      crs: self.crs(),
      elevation: self.elevation(),
      root_bounds: DAabb3::from_array(self.bounds),
      base_url: base_url.trim_end_matches('/').to_string(),
      extension: self.extension()?.to_string(),
    })
  }
}

fn check_bounds(field: &str, b: &[f64; 6]) -> Result<()> {
  check_box(field, [b[0], b[1], b[2]], [b[3], b[4], b[5]])
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;

  const EPT_JSON: &str = r#"{
    "bounds": [0, 0, -50, 100, 100, 50],
    "boundsConforming": [10, 10, 2, 90, 90, 6],
    "dataType": "laszip",
    "hierarchyType": "json",
    "points": 1000,
    "schema": [{"name": "X", "type": "signed", "size": 4}],
    "span": 128,
    "srs": {"authority": "EPSG", "horizontal": "2154", "vertical": "5720"},
    "version": "1.0.0"
  }"#;

  #[test]
  fn test_parse_metadata() {
    let info = EptInfo::from_json(EPT_JSON).unwrap();
    assert_eq!(info.points, 1000);
    assert_eq!(info.span, 128);
    assert_eq!(info.extension().unwrap(), "laz");
    assert_eq!(info.crs(), "EPSG:2154");
  }

  #[test]
  fn test_source_info() {
    let info = EptInfo::from_json(EPT_JSON).unwrap();
    let source = info.source_info("https://example.org/ept/").unwrap();

    assert_eq!(source.base_url, "https://example.org/ept");
    assert_eq!(source.spacing, 100.0 / 128.0);
    assert_eq!(source.elevation, ElevationRange::new(2.0, 6.0));
    assert_eq!(source.root_bounds.min, DVec3::new(0.0, 0.0, -50.0));
    assert_eq!(source.root_bounds.max, DVec3::new(100.0, 100.0, 50.0));
  }

  #[test]
  fn test_missing_srs_is_geocentric() {
    let text = EPT_JSON.replace(
      r#""srs": {"authority": "EPSG", "horizontal": "2154", "vertical": "5720"},"#,
      "",
    );
    let info = EptInfo::from_json(&text).unwrap();
    assert_eq!(info.crs(), "EPSG:4978");
  }

  #[test]
  fn test_rejects_zero_span() {
    let text = EPT_JSON.replace(r#""span": 128"#, r#""span": 0"#);
    assert!(matches!(
      EptInfo::from_json(&text),
      Err(PointCloudError::InvalidMetadata(_))
    ));
  }

  #[test]
  fn test_rejects_inverted_bounds() {
    let text = EPT_JSON.replace("[0, 0, -50, 100, 100, 50]", "[0, 0, 50, 100, 100, -50]");
    assert!(matches!(
      EptInfo::from_json(&text),
      Err(PointCloudError::InvalidMetadata(_))
    ));

    let text = EPT_JSON.replace("[10, 10, 2, 90, 90, 6]", "[10, 10, 6, 90, 90, 2]");
    assert!(matches!(
      EptInfo::from_json(&text),
      Err(PointCloudError::InvalidMetadata(_))
    ));
  }

  #[test]
  fn test_unknown_data_type() {
    let text = EPT_JSON.replace("laszip", "mystery");
    let info = EptInfo::from_json(&text).unwrap();
    assert!(info.extension().is_err());
  }
}
