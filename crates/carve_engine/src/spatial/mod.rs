//! Spatial partitioning data structures
//!
//! Provides the region quadtree used by destructible terrain, the brushes
//! that edit it, and the 2-D bounds they are tested against.

mod bounds;
mod brush;
mod quadtree;

pub use bounds::{Aabb2, Containment};
pub use brush::{CircleBrush, RectangleBrush, TerrainBrush};
pub use quadtree::{FixtureSink, LeafInfo, NoFixtures, NodeState, QuadTreeNode};
