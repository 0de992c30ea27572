//! Hierarchy expansion.
//!
//! Turns hierarchy information into child nodes of a
//! [`PointCloudOctree`](crate::octree::PointCloudOctree):
//!
//! - [`explicit`]: per-chunk documents mapping identities to point counts
//! - [`bitfield`]: 8-bit child occupancy carried by each node
//! - [`hrc`]: packed binary occupancy chunks (`.hrc`), decoded eagerly

pub mod bitfield;
pub mod explicit;
pub mod hrc;

pub use bitfield::ChildrenBitfield;
pub use explicit::HierarchyChunk;
pub use hrc::{decode_hrc, HrcRecord};
