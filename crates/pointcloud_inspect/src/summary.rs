//! Per-depth statistics of an expanded octree.

use pointcloud_octree::{NodeLayout, PointCloudOctree};
use std::collections::BTreeMap;

/// Counts for one depth level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
	pub nodes: usize,
	pub leaves: usize,
	/// Nodes whose point count is still unknown.
	pub unresolved: usize,
	pub points: u64,
}

#[derive(Debug, Default)]
pub struct Summary {
	pub levels: BTreeMap<u32, LevelStats>,
}

impl Summary {
	pub fn collect<L: NodeLayout>(tree: &PointCloudOctree<L>) -> Self {
		let mut levels: BTreeMap<u32, LevelStats> = BTreeMap::new();
		for (_, node) in tree.iter() {
			let level = levels.entry(node.depth()).or_default();
			level.nodes += 1;
			level.leaves += node.is_leaf() as usize;
			match node.num_points() {
				Some(points) => level.points += points,
				None => level.unresolved += 1,
			}
		}
		Self { levels }
	}

	pub fn total_nodes(&self) -> usize {
		self.levels.values().map(|l| l.nodes).sum()
	}

	pub fn total_points(&self) -> u64 {
		self.levels.values().map(|l| l.points).sum()
	}

	pub fn print(&self) {
		println!("{:>5} {:>9} {:>9} {:>11} {:>14}", "depth", "nodes", "leaves", "unresolved", "points");
		for (depth, level) in &self.levels {
			println!(
				"{:>5} {:>9} {:>9} {:>11} {:>14}",
				depth, level.nodes, level.leaves, level.unresolved, level.points
			);
		}
		println!(
			"total: {} nodes, {} points",
			self.total_nodes(),
			self.total_points()
		);
	}
}
