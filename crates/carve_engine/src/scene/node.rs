//! Transform nodes
//!
//! A node stores its transform relative to its parent (local), in world space
//! (global), or both. Whichever side is missing is resolved lazily through the
//! parent chain and cached, so reads take `&self` and the caches live in
//! [`Cell`]s.

use std::cell::Cell;

use super::{MovableId, NodeId};
use crate::foundation::math::{Mat4, Transform};

/// Which representations of a node's transform are currently valid
///
/// There is no "neither" state, so a node can always be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    /// Only the local transform is known; global is derived from the parent
    LocalValid,
    /// Only the global transform is known; local is derived from the parent
    GlobalValid,
    /// Both are cached and agree with the parent's current frame
    BothValid,
}

impl TransformState {
    /// Check if the local slot may be read
    pub fn has_local(self) -> bool {
        matches!(self, Self::LocalValid | Self::BothValid)
    }

    /// Check if the global slot may be read
    pub fn has_global(self) -> bool {
        matches!(self, Self::GlobalValid | Self::BothValid)
    }
}

/// A node of the scene hierarchy
///
/// Nodes are owned by the [`SceneGraph`](super::SceneGraph) arena. The parent
/// link is a plain handle; children are kept in insertion order.
#[derive(Debug)]
pub struct TransformNode {
    name: Option<String>,
    state: Cell<TransformState>,
    local: Cell<Transform>,
    global: Cell<Transform>,
    matrix: Cell<Option<Mat4>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) movables: Vec<MovableId>,
}

impl TransformNode {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            name,
            state: Cell::new(TransformState::LocalValid),
            local: Cell::new(Transform::identity()),
            global: Cell::new(Transform::identity()),
            matrix: Cell::new(None),
            parent: None,
            children: Vec::new(),
            movables: Vec::new(),
        }
    }

    /// Optional debug name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parent node, `None` for the root and for detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Movables attached to this node
    pub fn movables(&self) -> &[MovableId] {
        &self.movables
    }

    /// Current cache state
    pub fn state(&self) -> TransformState {
        self.state.get()
    }

    pub(crate) fn cached_local(&self) -> Option<Transform> {
        self.state.get().has_local().then(|| self.local.get())
    }

    pub(crate) fn cached_global(&self) -> Option<Transform> {
        self.state.get().has_global().then(|| self.global.get())
    }

    pub(crate) fn cached_matrix(&self) -> Option<Mat4> {
        self.matrix.get()
    }

    pub(crate) fn cache_matrix(&self, matrix: Mat4) {
        self.matrix.set(Some(matrix));
    }

    /// Store a local transform that is authoritative from now on
    pub(crate) fn assign_local(&self, local: Transform) {
        self.local.set(local);
        self.state.set(TransformState::LocalValid);
        self.matrix.set(None);
    }

    /// Store a global transform that is authoritative from now on
    pub(crate) fn assign_global(&self, global: Transform) {
        self.global.set(global);
        self.state.set(TransformState::GlobalValid);
        self.matrix.set(None);
    }

    /// Remember a local transform derived from the current global
    pub(crate) fn remember_local(&self, local: Transform) {
        self.local.set(local);
        self.state.set(TransformState::BothValid);
    }

    /// Remember a global transform derived from the current local
    pub(crate) fn remember_global(&self, global: Transform) {
        self.global.set(global);
        self.state.set(TransformState::BothValid);
    }

    /// Forget the global transform. The local one must already be valid.
    pub(crate) fn forget_global(&self) {
        debug_assert!(self.state.get().has_local());
        self.state.set(TransformState::LocalValid);
        self.matrix.set(None);
    }

    /// Forget the local transform. The global one must already be valid.
    pub(crate) fn forget_local(&self) {
        debug_assert!(self.state.get().has_global());
        self.state.set(TransformState::GlobalValid);
    }
}
