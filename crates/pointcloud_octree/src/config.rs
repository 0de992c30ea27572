//! PointCloudConfig - how a dataset is opened and loaded.

use serde::Deserialize;

use crate::source::NetworkOptions;

/// Dataset metadata flavour, which also selects the hierarchy layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
  /// `ept.json` + explicit JSON hierarchy chunks.
  #[default]
  Ept,
  /// `cloud.js` + per-node child bitfields.
  Potree,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PointCloudConfig {
  pub format: DatasetFormat,

  /// Dataset root. Resource URLs are built below it.
  pub base_url: String,

  /// CRS override, for datasets whose metadata carries none.
  pub crs: Option<String>,

  /// Passed through unmodified to every fetch.
  pub network: NetworkOptions,

  /// Upper bound on loads in flight. 0 = unlimited.
  pub max_concurrent_loads: usize,
}

impl Default for PointCloudConfig {
  fn default() -> Self {
    Self {
      format: DatasetFormat::default(),
      base_url: ".".to_string(),
      crs: None,
      network: NetworkOptions::default(),
      max_concurrent_loads: 8,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
