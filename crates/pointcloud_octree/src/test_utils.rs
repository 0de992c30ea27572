//! Test utilities: fixture datasets and an in-memory source.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::Receiver;
use glam::DVec3;

use crate::bounds::{DAabb3, ElevationRange};
use crate::error::{PointCloudError, Result};
use crate::hierarchy::ChildrenBitfield;
use crate::loader::{LoadEvent, NodeLoader};
use crate::octree::{BitfieldLayout, EptLayout, NodeLayout, PointCloudOctree};
use crate::source::{NetworkOptions, NodeContext, Payload, PointCloudSource, SourceInfo};

// =============================================================================
// Fixtures
// =============================================================================

/// `[0,8]^3` cube with points between z = 2 and z = 6, in a projected CRS.
pub fn cube_info() -> SourceInfo {
  SourceInfo {
    spacing: 1.0,
    crs: "EPSG:2154".to_string(),
    elevation: ElevationRange::new(2.0, 6.0),
    root_bounds: DAabb3::new(DVec3::ZERO, DVec3::splat(8.0)),
    base_url: "mem://cloud".to_string(),
    extension: "bin".to_string(),
  }
}

pub fn ept_tree() -> PointCloudOctree<EptLayout> {
  PointCloudOctree::new(EptLayout, cube_info())
}

pub fn bitfield_tree() -> PointCloudOctree<BitfieldLayout> {
  PointCloudOctree::new(BitfieldLayout::new("data", 5), cube_info())
}

// =============================================================================
// MockSource
// =============================================================================

/// In-memory source. Payloads are the stored bytes; a node listed in
/// `bitfields` reports that occupancy with its payload.
pub struct MockSource {
  info: SourceInfo,
  network: NetworkOptions,
  files: HashMap<String, Vec<u8>>,
  bitfields: HashMap<String, u8>,
  fetched: Mutex<Vec<String>>,
  /// When set, every fetch waits for one message before returning.
  gate: Option<Receiver<()>>,
  /// Node keys whose payload parse panics.
  broken: HashSet<String>,
}

impl MockSource {
  pub fn new(info: SourceInfo) -> Self {
    Self {
      info,
      network: NetworkOptions::default(),
      files: HashMap::new(),
      bitfields: HashMap::new(),
      fetched: Mutex::new(Vec::new()),
      gate: None,
      broken: HashSet::new(),
    }
  }

  pub fn with_file(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
    self.files.insert(url.into(), bytes.into());
    self
  }

  pub fn with_bitfield(mut self, key: impl Into<String>, bits: u8) -> Self {
    self.bitfields.insert(key.into(), bits);
    self
  }

  pub fn with_gate(mut self, gate: Receiver<()>) -> Self {
    self.gate = Some(gate);
    self
  }

  pub fn with_broken_parser(mut self, key: impl Into<String>) -> Self {
    self.broken.insert(key.into());
    self
  }

  /// Every URL fetched so far, in order.
  pub fn fetched(&self) -> Vec<String> {
    self.fetched.lock().map(|f| f.clone()).unwrap_or_default()
  }

  pub fn fetch_count(&self, url: &str) -> usize {
    self.fetched().iter().filter(|u| *u == url).count()
  }
}

impl PointCloudSource for MockSource {
  type Geometry = Vec<u8>;

  fn info(&self) -> &SourceInfo {
    &self.info
  }

  fn network_options(&self) -> &NetworkOptions {
    &self.network
  }

  fn fetch(&self, url: &str, _options: &NetworkOptions) -> Result<Vec<u8>> {
    if let Ok(mut fetched) = self.fetched.lock() {
      fetched.push(url.to_string());
    }
    if let Some(gate) = &self.gate {
      let _ = gate.recv_timeout(Duration::from_secs(5));
    }
    self.files.get(url).cloned().ok_or_else(|| PointCloudError::Fetch {
      url: url.to_string(),
      message: "not found".to_string(),
    })
  }

  fn parse(&self, bytes: Vec<u8>, node: &NodeContext) -> Result<Payload<Vec<u8>>> {
    if self.broken.contains(&node.key) {
      panic!("corrupt payload for {}", node.key);
    }
    Ok(match self.bitfields.get(&node.key) {
      Some(&bits) => Payload::with_children(bytes, ChildrenBitfield(bits)),
      None => Payload::new(bytes),
    })
  }
}

/// Poll until the loader is idle, collecting every event.
pub fn drain<L: NodeLayout>(
  loader: &mut NodeLoader<L, MockSource>,
  tree: &mut PointCloudOctree<L>,
) -> Vec<LoadEvent<L::Key, Vec<u8>>> {
  let mut events = Vec::new();
  for _ in 0..1000 {
    events.extend(loader.poll(tree));
    if loader.is_idle() {
      return events;
    }
    std::thread::sleep(Duration::from_millis(5));
  }
  panic!("loader did not become idle");
}
