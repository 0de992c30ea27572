//! Lazily materialized point-cloud octree.
//!
//! - [`PointCloudOctree`]: arena owning the nodes of one dataset
//! - [`PointCloudNode`]: one cell, addressed by [`NodeId`]
//! - [`NodeKey`]: node identities ([`EptKey`], [`PathKey`])
//! - [`NodeLayout`]: per-format behaviour ([`EptLayout`], [`BitfieldLayout`])

mod key;
mod layout;
mod node;
mod tree;

pub use key::{EptKey, NodeKey, PathKey};
pub use layout::{BitfieldLayout, EptLayout, NodeLayout};
pub use node::{Cached, NodeId, PointCloudNode, RenderState};
pub use tree::PointCloudOctree;
