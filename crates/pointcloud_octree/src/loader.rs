//! Node loading.
//!
//! Two entry points:
//!
//! - [`load_octree`] / [`load`]: blocking, for tools and tests.
//! - [`NodeLoader`]: non-blocking. Fetch and parse run on rayon workers,
//!   results come back over bounded crossbeam channels and are applied to the
//!   tree by [`NodeLoader::poll`] on the caller's thread.
//!
//! Every node key has at most one load in flight. A finished load is kept
//! (`Ready` or `Failed`) until the owner calls [`NodeLoader::forget`]; the
//! loader never retries on its own.
//!
//! For layouts that fetch hierarchy documents, a load runs in two stages:
//! the hierarchy is fetched first and applied on `poll`, then the payload
//! fetch is started with the node's now-resolved context.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::config::PointCloudConfig;
use crate::error::{PointCloudError, Result};
use crate::hierarchy::ChildrenBitfield;
use crate::octree::{NodeId, NodeLayout, PointCloudOctree};
use crate::source::{NodeContext, Payload, PointCloudSource};

// =============================================================================
// Blocking loads
// =============================================================================

/// Resolve the direct children of `id`, fetching the hierarchy document if
/// the layout uses one. Returns the number of nodes created.
pub fn load_octree<L: NodeLayout, S: PointCloudSource>(
  tree: &mut PointCloudOctree<L>,
  id: NodeId,
  source: &S,
) -> Result<usize> {
  let document = match tree.hierarchy_url(id)? {
    Some(url) => Some(source.fetch(&url, source.network_options())?),
    None => None,
  };
  L::expand(tree, id, document.as_deref())
}

/// Resolve the hierarchy if needed, then fetch and parse the node payload.
pub fn load<L: NodeLayout, S: PointCloudSource>(
  tree: &mut PointCloudOctree<L>,
  id: NodeId,
  source: &S,
) -> Result<S::Geometry> {
  if !tree.octree_is_loaded(id)? {
    load_octree(tree, id, source)?;
  }
  let url = tree.data_url(id)?;
  let context = tree.context(id)?;
  let bytes = source.fetch(&url, source.network_options())?;
  let payload = source.parse(bytes, &context)?;
  apply_children(tree, id, payload.children_bitfield)?;
  Ok(payload.geometry)
}

/// Record a payload's child occupancy and expand the node if that makes its
/// children known-but-missing.
fn apply_children<L: NodeLayout>(
  tree: &mut PointCloudOctree<L>,
  id: NodeId,
  bitfield: Option<ChildrenBitfield>,
) -> Result<usize> {
  let Some(bitfield) = bitfield else {
    return Ok(0);
  };
  tree.set_children_bitfield(id, bitfield)?;
  if tree.octree_is_loaded(id)? {
    return Ok(0);
  }
  L::expand(tree, id, None)
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared flag checked by workers before each fetch and before parsing.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }

  fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      Err(PointCloudError::Cancelled)
    } else {
      Ok(())
    }
  }
}

// =============================================================================
// Worker jobs
// =============================================================================

enum Job {
  Hierarchy { url: String },
  Payload { url: String, context: NodeContext },
}

enum Stage<G> {
  Hierarchy(Result<Vec<u8>>),
  Payload(Result<Payload<G>>),
}

fn payload_job<L: NodeLayout>(tree: &PointCloudOctree<L>, id: NodeId) -> Result<Job> {
  Ok(Job::Payload {
    url: tree.data_url(id)?,
    context: tree.context(id)?,
  })
}

fn fetch_hierarchy<S: PointCloudSource>(source: &S, cancel: &CancelToken, url: &str) -> Result<Vec<u8>> {
  cancel.check()?;
  source.fetch(url, source.network_options())
}

fn fetch_payload<S: PointCloudSource>(
  source: &S,
  cancel: &CancelToken,
  url: &str,
  context: &NodeContext,
) -> Result<Payload<S::Geometry>> {
  cancel.check()?;
  let bytes = source.fetch(url, source.network_options())?;
  cancel.check()?;
  source.parse(bytes, context)
}

fn spawn_job<S: PointCloudSource>(source: &Arc<S>, cancel: &CancelToken, job: Job) -> Receiver<Stage<S::Geometry>> {
  let (sender, receiver) = crossbeam_channel::bounded(1);
  let source = Arc::clone(source);
  let cancel = cancel.clone();

  rayon::spawn(move || {
    #[cfg(feature = "tracing-spans")]
    let _span = tracing::info_span!("loader::job").entered();

    let stage = match job {
      Job::Hierarchy { url } => Stage::Hierarchy(guarded(|| fetch_hierarchy(&*source, &cancel, &url))),
      Job::Payload { url, context } => {
        Stage::Payload(guarded(|| fetch_payload(&*source, &cancel, &url, &context)))
      }
    };
    // Receiver dropped = load cancelled.
    let _ = sender.send(stage);
  });

  receiver
}

/// Run a worker stage, turning a panic into an error so the slot still
/// resolves instead of aborting the process.
fn guarded<T>(stage: impl FnOnce() -> Result<T>) -> Result<T> {
  panic::catch_unwind(AssertUnwindSafe(stage)).unwrap_or_else(|panic| {
    let message = panic
      .downcast_ref::<&str>()
      .map(|s| s.to_string())
      .or_else(|| panic.downcast_ref::<String>().cloned())
      .unwrap_or_else(|| "unknown panic".to_string());
    Err(PointCloudError::WorkerPanicked(message))
  })
}

// =============================================================================
// NodeLoader
// =============================================================================

enum LoadSlot<G> {
  Pending {
    node: NodeId,
    receiver: Receiver<Stage<G>>,
    cancel: CancelToken,
  },
  Ready(Arc<G>),
  Failed(Arc<PointCloudError>),
}

/// Memoized state of one node's load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  Pending,
  Ready,
  Failed,
}

/// Result of [`NodeLoader::request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
  /// A new load was started.
  Started,
  /// A load for this node is already in flight.
  InFlight,
  /// The payload is already available.
  Ready,
  /// The previous load failed; call [`NodeLoader::forget`] to retry.
  Failed,
  /// `max_concurrent_loads` is reached; nothing was started.
  Throttled,
}

#[derive(Debug)]
pub enum LoadEvent<K, G> {
  /// The node's hierarchy was applied; its payload is being fetched.
  Expanded { node: NodeId, key: K, created: usize },
  Loaded {
    node: NodeId,
    key: K,
    geometry: Arc<G>,
    created: usize,
  },
  Failed {
    node: NodeId,
    key: K,
    error: Arc<PointCloudError>,
  },
}

/// Loader counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
  pub started: u64,
  pub loaded: u64,
  pub failed: u64,
  pub cancelled: u64,
  pub throttled: u64,
}

pub struct NodeLoader<L: NodeLayout, S: PointCloudSource> {
  source: Arc<S>,
  slots: HashMap<L::Key, LoadSlot<S::Geometry>>,
  /// 0 = unlimited.
  max_concurrent_loads: usize,
  stats: LoaderStats,
}

impl<L: NodeLayout, S: PointCloudSource> NodeLoader<L, S> {
  pub fn new(source: Arc<S>) -> Self {
    Self {
      source,
      slots: HashMap::new(),
      max_concurrent_loads: 0,
      stats: LoaderStats::default(),
    }
  }

  pub fn from_config(source: Arc<S>, config: &PointCloudConfig) -> Self {
    Self::new(source).with_max_concurrent_loads(config.max_concurrent_loads)
  }

  pub fn with_max_concurrent_loads(mut self, max: usize) -> Self {
    self.max_concurrent_loads = max;
    self
  }

  pub fn source(&self) -> &Arc<S> {
    &self.source
  }

  pub fn stats(&self) -> LoaderStats {
    self.stats
  }

  /// Start loading `id` unless a load for it is in flight or finished.
  ///
  /// Layouts without hierarchy documents are expanded here, synchronously,
  /// before the payload fetch is started.
  pub fn request(&mut self, tree: &mut PointCloudOctree<L>, id: NodeId) -> Result<RequestOutcome> {
    let key = tree.node(id)?.key().clone();
    if let Some(slot) = self.slots.get(&key) {
      return Ok(match slot {
        LoadSlot::Pending { .. } => RequestOutcome::InFlight,
        LoadSlot::Ready(_) => RequestOutcome::Ready,
        LoadSlot::Failed(_) => RequestOutcome::Failed,
      });
    }
    if self.max_concurrent_loads != 0 && self.pending_count() >= self.max_concurrent_loads {
      self.stats.throttled += 1;
      return Ok(RequestOutcome::Throttled);
    }

    let job = if tree.octree_is_loaded(id)? {
      payload_job(tree, id)?
    } else {
      match tree.hierarchy_url(id)? {
        Some(url) => Job::Hierarchy { url },
        None => {
          L::expand(tree, id, None)?;
          payload_job(tree, id)?
        }
      }
    };

    let cancel = CancelToken::new();
    let receiver = spawn_job(&self.source, &cancel, job);
    tracing::debug!(key = %key, "load started");
    self.slots.insert(
      key,
      LoadSlot::Pending {
        node: id,
        receiver,
        cancel,
      },
    );
    self.stats.started += 1;
    Ok(RequestOutcome::Started)
  }

  /// Apply every finished stage to `tree`. Never blocks.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "loader::poll"))]
  pub fn poll(&mut self, tree: &mut PointCloudOctree<L>) -> Vec<LoadEvent<L::Key, S::Geometry>> {
    let pending: Vec<L::Key> = self
      .slots
      .iter()
      .filter(|(_, slot)| matches!(slot, LoadSlot::Pending { .. }))
      .map(|(key, _)| key.clone())
      .collect();

    let mut events = Vec::new();
    for key in pending {
      let Some(LoadSlot::Pending { node, receiver, .. }) = self.slots.get(&key) else {
        continue;
      };
      let node = *node;
      let stage = match receiver.try_recv() {
        Ok(stage) => stage,
        Err(TryRecvError::Empty) => continue,
        // Workers always send unless they die outside `guarded`.
        Err(TryRecvError::Disconnected) => Stage::Payload(Err(PointCloudError::WorkerPanicked(
          "worker dropped its result".to_string(),
        ))),
      };
      events.push(self.advance(tree, key, node, stage));
    }
    events
  }

  fn advance(
    &mut self,
    tree: &mut PointCloudOctree<L>,
    key: L::Key,
    node: NodeId,
    stage: Stage<S::Geometry>,
  ) -> LoadEvent<L::Key, S::Geometry> {
    match stage {
      Stage::Hierarchy(Ok(document)) => {
        let expanded = L::expand(tree, node, Some(&document))
          .and_then(|created| payload_job(tree, node).map(|job| (created, job)));
        match expanded {
          Ok((created, job)) => {
            if let Some(LoadSlot::Pending { receiver, cancel, .. }) = self.slots.get_mut(&key) {
              *receiver = spawn_job(&self.source, cancel, job);
            }
            tracing::debug!(key = %key, created, "hierarchy applied");
            LoadEvent::Expanded { node, key, created }
          }
          Err(error) => self.fail(key, node, error),
        }
      }
      Stage::Payload(Ok(payload)) => match apply_children(tree, node, payload.children_bitfield) {
        Ok(created) => {
          let geometry = Arc::new(payload.geometry);
          tracing::debug!(key = %key, created, "load finished");
          self.slots.insert(key.clone(), LoadSlot::Ready(Arc::clone(&geometry)));
          self.stats.loaded += 1;
          LoadEvent::Loaded {
            node,
            key,
            geometry,
            created,
          }
        }
        Err(error) => self.fail(key, node, error),
      },
      Stage::Hierarchy(Err(error)) | Stage::Payload(Err(error)) => self.fail(key, node, error),
    }
  }

  fn fail(&mut self, key: L::Key, node: NodeId, error: PointCloudError) -> LoadEvent<L::Key, S::Geometry> {
    tracing::warn!(key = %key, error = %error, "load failed");
    let error = Arc::new(error);
    self.slots.insert(key.clone(), LoadSlot::Failed(Arc::clone(&error)));
    self.stats.failed += 1;
    LoadEvent::Failed { node, key, error }
  }

  /// Abandon an in-flight load. Returns false when nothing was pending.
  pub fn cancel(&mut self, key: &L::Key) -> bool {
    match self.slots.get(key) {
      Some(LoadSlot::Pending { cancel, .. }) => cancel.cancel(),
      _ => return false,
    }
    self.slots.remove(key);
    self.stats.cancelled += 1;
    tracing::debug!(key = %key, "load cancelled");
    true
  }

  pub fn cancel_all(&mut self) {
    let mut cancelled = 0;
    self.slots.retain(|_, slot| match slot {
      LoadSlot::Pending { cancel, .. } => {
        cancel.cancel();
        cancelled += 1;
        false
      }
      _ => true,
    });
    self.stats.cancelled += cancelled;
  }

  /// Drop a finished result so the next request loads again. Pending loads
  /// are left alone; use [`Self::cancel`] for those.
  pub fn forget(&mut self, key: &L::Key) -> bool {
    match self.slots.get(key) {
      None | Some(LoadSlot::Pending { .. }) => false,
      Some(_) => self.slots.remove(key).is_some(),
    }
  }

  pub fn state(&self, key: &L::Key) -> LoadState {
    match self.slots.get(key) {
      None => LoadState::Idle,
      Some(LoadSlot::Pending { .. }) => LoadState::Pending,
      Some(LoadSlot::Ready(_)) => LoadState::Ready,
      Some(LoadSlot::Failed(_)) => LoadState::Failed,
    }
  }

  pub fn geometry(&self, key: &L::Key) -> Option<Arc<S::Geometry>> {
    match self.slots.get(key) {
      Some(LoadSlot::Ready(geometry)) => Some(Arc::clone(geometry)),
      _ => None,
    }
  }

  pub fn error(&self, key: &L::Key) -> Option<Arc<PointCloudError>> {
    match self.slots.get(key) {
      Some(LoadSlot::Failed(error)) => Some(Arc::clone(error)),
      _ => None,
    }
  }

  pub fn pending_count(&self) -> usize {
    self
      .slots
      .values()
      .filter(|slot| matches!(slot, LoadSlot::Pending { .. }))
      .count()
  }

  pub fn is_idle(&self) -> bool {
    self.pending_count() == 0
  }
}

impl<L: NodeLayout, S: PointCloudSource> Drop for NodeLoader<L, S> {
  fn drop(&mut self) {
    self.cancel_all();
  }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
