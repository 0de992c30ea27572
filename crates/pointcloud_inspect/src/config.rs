//! Configuration parsing for dataset inspection.

use anyhow::{Context, Result};
use pointcloud_octree::PointCloudConfig;
use serde::Deserialize;
use std::path::Path;

/// Root configuration for inspection runs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Dataset options shared with the library.
	pub dataset: PointCloudConfig,
	/// Deepest level expanded when summarizing.
	pub max_depth: u32,
	/// Number of node payloads to load through the async loader.
	pub sample_payloads: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			dataset: PointCloudConfig::default(),
			max_depth: 6,
			sample_payloads: 0,
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config: Config =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;

		if config.max_depth > 24 {
			anyhow::bail!("max_depth must be at most 24, got {}", config.max_depth);
		}

		Ok(config)
	}
}
