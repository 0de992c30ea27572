//! Point-cloud dataset inspector.
//!
//! Opens a local EPT (`ept.json`) or Potree 1.x (`cloud.js`) dataset,
//! expands its octree hierarchy down to a depth limit and prints per-depth
//! node and point counts. Optionally loads a sample of node payloads through
//! the asynchronous loader.

mod config;
mod summary;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pointcloud_octree::{
	decode_hrc, load_octree, BitfieldLayout, DatasetFormat, DirectorySource, EptLayout, LoadEvent,
	NodeId, NodeLayout, NodeLoader, PointCloudOctree, PointCloudSource, RequestOutcome,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::Config;
use summary::Summary;

/// Dataset layout selected on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
	Ept,
	Potree,
}

impl From<Format> for DatasetFormat {
	fn from(format: Format) -> Self {
		match format {
			Format::Ept => DatasetFormat::Ept,
			Format::Potree => DatasetFormat::Potree,
		}
	}
}

/// Point-cloud octree inspector.
#[derive(Parser, Debug)]
#[command(name = "pointcloud_inspect")]
#[command(about = "Expands a point-cloud hierarchy and prints per-depth statistics")]
struct Args {
	/// Dataset directory (containing ept.json or cloud.js).
	dataset: PathBuf,

	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Dataset format (default: detected from the metadata file present).
	#[arg(short, long, value_enum)]
	format: Option<Format>,

	/// CRS of the dataset, for Potree datasets without an EPSG projection.
	#[arg(long)]
	crs: Option<String>,

	/// Deepest level to expand.
	#[arg(short = 'd', long)]
	max_depth: Option<u32>,

	/// Number of node payloads to load through the async loader.
	#[arg(short, long)]
	sample: Option<usize>,
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			println!("Loading config from: {}", path.display());
			Config::load(path)?
		}
		None => Config::default(),
	};

	// Command line wins over the config file
	config.dataset.base_url = args.dataset.display().to_string();
	if let Some(format) = args.format {
		config.dataset.format = format.into();
	} else if args.config.is_none() {
		config.dataset.format = detect_format(&args.dataset)?;
	}
	if args.crs.is_some() {
		config.dataset.crs = args.crs.clone();
	}
	if let Some(depth) = args.max_depth {
		config.max_depth = depth;
	}
	if let Some(sample) = args.sample {
		config.sample_payloads = sample;
	}

	println!("Dataset: {} ({:?})", config.dataset.base_url, config.dataset.format);

	match config.dataset.format {
		DatasetFormat::Ept => inspect_ept(&args.dataset, &config),
		DatasetFormat::Potree => inspect_potree(&args.dataset, &config),
	}
}

fn detect_format(dir: &Path) -> Result<DatasetFormat> {
	if dir.join("ept.json").is_file() {
		Ok(DatasetFormat::Ept)
	} else if dir.join("cloud.js").is_file() {
		Ok(DatasetFormat::Potree)
	} else {
		anyhow::bail!(
			"No ept.json or cloud.js found in {}; pass --format",
			dir.display()
		)
	}
}

// =============================================================================
// EPT
// =============================================================================

fn inspect_ept(dir: &Path, config: &Config) -> Result<()> {
	let (source, metadata) = DirectorySource::open_ept(dir, config.dataset.network.clone())
		.with_context(|| format!("Failed to open EPT dataset: {}", dir.display()))?;
	println!(
		"EPT: {} points, span {}, crs {}",
		metadata.points,
		metadata.span,
		metadata.crs()
	);

	let source = Arc::new(source);
	let mut tree = PointCloudOctree::new(EptLayout, source.info().clone());

	// Fetch hierarchy chunks until every node within the depth limit is resolved.
	loop {
		let pending: Vec<NodeId> = tree
			.iter()
			.filter(|(_, node)| !node.has_resolved_count() && node.depth() <= config.max_depth)
			.map(|(id, _)| id)
			.collect();
		if pending.is_empty() {
			break;
		}
		for id in pending {
			let created = load_octree(&mut tree, id, &*source)
				.with_context(|| format!("Failed to load hierarchy of node {:?}", id))?;
			tracing::debug!(?id, created, "expanded hierarchy chunk");
		}
	}

	finish(tree, source, config)
}

// =============================================================================
// Potree
// =============================================================================

fn inspect_potree(dir: &Path, config: &Config) -> Result<()> {
	let (source, metadata) = DirectorySource::open_potree(
		dir,
		config.dataset.crs.as_deref(),
		config.dataset.network.clone(),
	)
	.with_context(|| format!("Failed to open Potree dataset: {}", dir.display()))?;
	println!(
		"Potree {}: {} points, step size {}",
		metadata.version.as_deref().unwrap_or("?"),
		metadata
			.points
			.map_or_else(|| "?".to_string(), |p| p.to_string()),
		metadata.hierarchy_step_size
	);

	let source = Arc::new(source);
	let layout = BitfieldLayout::from_info(&metadata);
	let mut tree = PointCloudOctree::new(layout, source.info().clone());

	// Each chunk root whose children are not known yet gets its .hrc applied.
	let mut visited = HashSet::new();
	loop {
		let pending: Vec<NodeId> = tree
			.iter()
			.filter(|(id, node)| {
				node.depth() <= config.max_depth
					&& tree.layout().is_chunk_root(node.key())
					&& (!node.has_resolved_count() || !tree.layout().octree_is_loaded(node))
					&& !visited.contains(id)
			})
			.map(|(id, _)| id)
			.collect();
		if pending.is_empty() {
			break;
		}
		for id in pending {
			visited.insert(id);
			let url = tree.layout().hrc_url(tree.info(), tree.node(id)?.key());
			match source.fetch(&url, source.network_options()) {
				Ok(bytes) => {
					let records = decode_hrc(&bytes).with_context(|| format!("Bad hierarchy chunk: {url}"))?;
					tree.apply_hrc(id, &records)?;
				}
				Err(e) => {
					tracing::warn!(url = %url, error = %e, "missing hierarchy chunk; expanding from bitfield");
					tree.expand_bitfield(id)?;
				}
			}
		}
	}

	finish(tree, source, config)
}

// =============================================================================
// Shared
// =============================================================================

fn finish<L: NodeLayout>(
	mut tree: PointCloudOctree<L>,
	source: Arc<DirectorySource>,
	config: &Config,
) -> Result<()> {
	Summary::collect(&tree).print();

	if config.sample_payloads > 0 {
		sample_payloads(&mut tree, source, config)?;
	}
	Ok(())
}

/// Load the payloads of the shallowest nodes, breadth first.
fn sample_payloads<L: NodeLayout>(
	tree: &mut PointCloudOctree<L>,
	source: Arc<DirectorySource>,
	config: &Config,
) -> Result<()> {
	let mut loader: NodeLoader<L, DirectorySource> = NodeLoader::from_config(source, &config.dataset);
	let mut queue: Vec<NodeId> = tree
		.descendants(tree.root())
		.take(config.sample_payloads)
		.collect();
	queue.reverse();

	let (mut loaded, mut failed, mut bytes) = (0usize, 0usize, 0usize);
	while !queue.is_empty() || !loader.is_idle() {
		while let Some(&id) = queue.last() {
			match loader.request(tree, id)? {
				RequestOutcome::Throttled => break,
				_ => {
					queue.pop();
				}
			}
		}

		for event in loader.poll(tree) {
			match event {
				LoadEvent::Loaded { geometry, .. } => {
					loaded += 1;
					bytes += geometry.bytes.len();
				}
				LoadEvent::Failed { key, error, .. } => {
					failed += 1;
					println!("  {key}: {error}");
				}
				LoadEvent::Expanded { .. } => {}
			}
		}
		std::thread::sleep(Duration::from_millis(1));
	}

	let stats = loader.stats();
	println!(
		"Loaded {} payloads ({} bytes), {} failed, {} throttled requests",
		loaded, bytes, failed, stats.throttled
	);
	Ok(())
}
