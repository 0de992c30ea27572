//! Potree 1.x dataset metadata (`cloud.js`).

use glam::DVec3;
use serde::Deserialize;

use super::{check_box, SourceInfo};
use crate::bounds::{DAabb3, ElevationRange};
use crate::crs::parse_epsg_code;
use crate::error::{PointCloudError, Result};

/// Name of the metadata document at the dataset root.
pub const METADATA_FILE: &str = "cloud.js";

/// `{lx, ly, lz, ux, uy, uz}` box.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PotreeBox {
  pub lx: f64,
  pub ly: f64,
  pub lz: f64,
  pub ux: f64,
  pub uy: f64,
  pub uz: f64,
}

impl PotreeBox {
  fn check(&self, field: &str) -> Result<()> {
    check_box(field, [self.lx, self.ly, self.lz], [self.ux, self.uy, self.uz])
  }
}

impl From<PotreeBox> for DAabb3 {
  fn from(b: PotreeBox) -> Self {
    DAabb3::new(DVec3::new(b.lx, b.ly, b.lz), DVec3::new(b.ux, b.uy, b.uz))
  }
}

/// Either the `"LAZ"` marker or a list of attribute names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PointAttributes {
  Named(String),
  List(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PotreeInfo {
  #[serde(default)]
  pub version: Option<String>,
  #[serde(rename = "octreeDir")]
  pub octree_dir: String,
  #[serde(default)]
  pub projection: Option<String>,
  #[serde(default)]
  pub points: Option<u64>,
  #[serde(rename = "boundingBox")]
  pub bounding_box: PotreeBox,
  #[serde(rename = "tightBoundingBox")]
  pub tight_bounding_box: Option<PotreeBox>,
  #[serde(rename = "pointAttributes")]
  pub point_attributes: PointAttributes,
  pub spacing: f64,
  #[serde(rename = "hierarchyStepSize")]
  pub hierarchy_step_size: u32,
}

impl PotreeInfo {
  pub fn from_json(text: &str) -> Result<Self> {
    let info: PotreeInfo = serde_json::from_str(text)?;
    if info.hierarchy_step_size == 0 {
      return Err(PointCloudError::InvalidMetadata(
        "hierarchyStepSize must be positive".into(),
      ));
    }
    info.bounding_box.check("boundingBox")?;
    if let Some(tight) = &info.tight_bounding_box {
      tight.check("tightBoundingBox")?;
    }
    Ok(info)
  }

  pub fn extension(&self) -> &'static str {
    match &self.point_attributes {
      PointAttributes::Named(name) if name == "LAZ" => "laz",
      _ => "bin",
    }
  }

  pub fn elevation(&self) -> ElevationRange {
    let b = self.tight_bounding_box.unwrap_or(self.bounding_box);
    ElevationRange::new(b.lz, b.uz)
  }

  /// `crs` overrides the `projection` field, which is often empty or a proj4
  /// string rather than an authority code.
  pub fn source_info(&self, base_url: &str, crs: Option<&str>) -> Result<SourceInfo> {
    let crs = match (crs, self.projection.as_deref()) {
      (Some(crs), _) => crs.to_string(),
      (None, Some(projection)) if parse_epsg_code(projection).is_some() => projection.to_string(),
      _ => {
        return Err(PointCloudError::InvalidMetadata(
          "cloud.js has no usable projection; a CRS must be supplied".into(),
        ))
      }
    };
    Ok(SourceInfo {
      spacing: self.spacing,
      crs,
      elevation: self.elevation(),
      root_bounds: self.bounding_box.into(),
      base_url: base_url.trim_end_matches('/').to_string(),
      extension: self.extension().to_string(),
    })
  }
}
