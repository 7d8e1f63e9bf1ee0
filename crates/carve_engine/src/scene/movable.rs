//! Movable payloads
//!
//! A movable is anything attached to a scene node: a drawable, an updatable
//! controller, a camera anchor. Each declares its capability tags once so the
//! scene can index it without runtime type inspection.

use std::any::Any;

use bitflags::bitflags;

use super::{NodeId, SceneGraph};
use crate::foundation::time::GameTime;
use crate::render::{Camera, RenderError, Renderer};

bitflags! {
    /// Capability tags used for monitor collections and layer matching
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Drawn by layers
        const RENDERABLE = 1 << 0;
        /// Visited by the scene update pass
        const UPDATABLE = 1 << 1;
        /// Provides a view into the world
        const CAMERA = 1 << 2;
        /// Mirrors a physics body
        const PHYSICAL = 1 << 3;
    }
}

/// A payload attached to at most one scene node at a time
pub trait Movable: Any {
    /// Debug name, also used by name-prefix layer matchers
    fn name(&self) -> &str {
        ""
    }

    /// Capability tags; must not change while the movable is registered
    fn capabilities(&self) -> Capabilities;

    /// Per-frame update, only called for [`Capabilities::UPDATABLE`] movables
    ///
    /// Structural changes requested on `scene` from here are deferred until
    /// the update pass finishes.
    fn update(&mut self, scene: &mut SceneGraph, node: NodeId, time: &GameTime, camera: &dyn Camera) {
        let _ = (scene, node, time, camera);
    }

    /// Draw, only called for [`Capabilities::RENDERABLE`] movables in a layer
    fn render(
        &self,
        scene: &SceneGraph,
        node: NodeId,
        camera: &dyn Camera,
        renderer: &mut dyn Renderer,
    ) -> Result<(), RenderError> {
        let _ = (scene, node, camera, renderer);
        Ok(())
    }

    /// Acquire resources
    fn load_content(&mut self) {}

    /// Release resources
    fn unload_content(&mut self) {}

    /// Called after the movable was attached to `node`
    fn on_attached(&mut self, node: NodeId) {
        let _ = node;
    }

    /// Called after the movable was detached from `node`
    fn on_detached(&mut self, node: NodeId) {
        let _ = node;
    }

    /// Upcast for typed lookups
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookups
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Bookkeeping for one movable in the scene arena
pub(crate) struct MovableSlot {
    /// `None` while the movable is lent out to its own update call
    pub(crate) movable: Option<Box<dyn Movable>>,
    pub(crate) capabilities: Capabilities,
    pub(crate) node: Option<NodeId>,
    pub(crate) live: bool,
}

impl MovableSlot {
    pub(crate) fn new(movable: Box<dyn Movable>) -> Self {
        Self {
            capabilities: movable.capabilities(),
            movable: Some(movable),
            node: None,
            live: false,
        }
    }
}
