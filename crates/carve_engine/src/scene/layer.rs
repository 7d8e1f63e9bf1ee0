//! Render layers
//!
//! A layer is a render pass over a filtered subset of the live renderables.
//! Layers draw in ascending depth; inside a layer, members draw back to front
//! by the Z of their node's world position.

use super::{Capabilities, Movable, MovableId};

/// Predicate deciding whether a renderable joins a layer automatically
pub type LayerMatcher = Box<dyn Fn(&dyn Movable) -> bool>;

/// A render pass over matching movables
pub struct Layer {
    name: String,
    depth: i32,
    matcher: LayerMatcher,
    pub(crate) members: Vec<MovableId>,
}

impl Layer {
    /// Create a layer with a matcher
    pub fn new(name: impl Into<String>, depth: i32, matcher: impl Fn(&dyn Movable) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            depth,
            matcher: Box::new(matcher),
            members: Vec::new(),
        }
    }

    /// Create a layer that only receives manually added renderables
    pub fn manual(name: impl Into<String>, depth: i32) -> Self {
        Self::new(name, depth, |_| false)
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draw order; lower depths draw first
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Members in the order they joined
    pub fn members(&self) -> &[MovableId] {
        &self.members
    }

    pub(crate) fn matches(&self, movable: &dyn Movable) -> bool {
        (self.matcher)(movable)
    }

    pub(crate) fn insert(&mut self, id: MovableId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.push(id);
        true
    }

    pub(crate) fn remove(&mut self, id: MovableId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != id);
        self.members.len() != before
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

/// Match movables carrying any of the given capabilities
pub fn any_capability(capabilities: Capabilities) -> impl Fn(&dyn Movable) -> bool {
    move |movable| movable.capabilities().intersects(capabilities)
}

/// Match movables carrying all of the given capabilities
pub fn all_capabilities(capabilities: Capabilities) -> impl Fn(&dyn Movable) -> bool {
    move |movable| movable.capabilities().contains(capabilities)
}

/// Match movables whose name starts with a prefix
pub fn name_prefix(prefix: impl Into<String>) -> impl Fn(&dyn Movable) -> bool {
    let prefix = prefix.into();
    move |movable| movable.name().starts_with(&prefix)
}
