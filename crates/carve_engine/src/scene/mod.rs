//! Scene management system
//!
//! A hierarchy of transform nodes with attached movable payloads.
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (arena)
//!   ├─ TransformNode  (lazy local/global transform caches)
//!   ├─ Movable        (renderable / updatable payloads, capability tags)
//!   ├─ Monitors       (live movables per capability set)
//!   ├─ Layers         (filtered render passes, sorted by depth and Z)
//!   └─ Events         (added/removed notifications, registration order)
//! ```

mod graph;
mod node;
mod movable;
mod events;
pub mod layer;

use slotmap::new_key_type;

pub use graph::{SceneGraph, SceneError};
pub use node::{TransformNode, TransformState};
pub use movable::{Capabilities, Movable};
pub use events::{ContentLoader, SceneEvent, SceneEventHandler};
pub use layer::{Layer, LayerMatcher};

new_key_type! {
    /// Handle to a transform node
    pub struct NodeId;
    /// Handle to a movable owned by a scene graph
    pub struct MovableId;
    /// Handle to a render layer
    pub struct LayerId;
}
