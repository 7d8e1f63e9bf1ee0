//! Scene notifications
//!
//! Key principles:
//! - Delivered synchronously, inside the call that caused them
//! - Handlers run in registration order and every handler sees every event
//! - The affected movable is lent to the handler for the duration of the call

use super::{Movable, MovableId, NodeId};

/// Something that happened to a movable's membership in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// The movable became reachable from the root
    MovableAdded {
        /// Movable that was added
        movable: MovableId,
        /// Node it is attached to
        node: NodeId,
    },
    /// The movable stopped being reachable from the root
    MovableRemoved {
        /// Movable that was removed
        movable: MovableId,
        /// Node it was attached to
        node: NodeId,
    },
}

impl SceneEvent {
    /// Movable the event refers to
    pub fn movable(&self) -> MovableId {
        match *self {
            Self::MovableAdded { movable, .. } | Self::MovableRemoved { movable, .. } => movable,
        }
    }

    /// Node the movable is (or was) attached to
    pub fn node(&self) -> NodeId {
        match *self {
            Self::MovableAdded { node, .. } | Self::MovableRemoved { node, .. } => node,
        }
    }
}

/// Observer of scene events
pub trait SceneEventHandler {
    /// Handle an event
    fn on_event(&mut self, event: &SceneEvent, movable: &mut dyn Movable);
}

impl<F> SceneEventHandler for F
where
    F: FnMut(&SceneEvent, &mut dyn Movable),
{
    fn on_event(&mut self, event: &SceneEvent, movable: &mut dyn Movable) {
        self(event, movable);
    }
}

/// Loads a movable's content the first time it enters the scene
///
/// Register it with [`SceneGraph::add_event_handler`](super::SceneGraph::add_event_handler)
/// to get the load-on-add behaviour; unloading happens when movables are
/// removed or their node is destroyed.
#[derive(Debug, Default)]
pub struct ContentLoader {
    loaded: Vec<MovableId>,
}

impl ContentLoader {
    /// Create a loader
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneEventHandler for ContentLoader {
    fn on_event(&mut self, event: &SceneEvent, movable: &mut dyn Movable) {
        if let SceneEvent::MovableAdded { movable: id, .. } = *event {
            if !self.loaded.contains(&id) {
                log::trace!("Loading content for '{}'", movable.name());
                movable.load_content();
                self.loaded.push(id);
            }
        }
    }
}

/// Ordered list of handlers
#[derive(Default)]
pub(crate) struct EventDispatcher {
    handlers: Vec<Box<dyn SceneEventHandler>>,
}

impl EventDispatcher {
    pub(crate) fn register(&mut self, handler: Box<dyn SceneEventHandler>) {
        self.handlers.push(handler);
    }

    pub(crate) fn dispatch(&mut self, event: &SceneEvent, movable: &mut dyn Movable) {
        for handler in &mut self.handlers {
            handler.on_event(event, movable);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
