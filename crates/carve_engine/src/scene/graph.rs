//! Scene graph
//!
//! Owns every transform node and every movable in slot-map arenas. Nodes refer
//! to each other by [`NodeId`]; a node's children are destroyed with it.
//!
//! A movable is *live* while it is attached to a node reachable from the root.
//! Only live movables appear in monitor collections and layers, and only
//! transitions of liveness produce [`SceneEvent`]s.
//!
//! Structural changes requested while [`SceneGraph::update`] is walking the
//! tree (re-linking nodes, attaching or detaching movables, destroying nodes
//! or movables) are buffered and applied once the walk has finished, removals
//! before additions.

use slotmap::SlotMap;
use thiserror::Error;

use super::events::{EventDispatcher, SceneEvent, SceneEventHandler};
use super::layer::Layer;
use super::movable::{Capabilities, Movable, MovableSlot};
use super::node::TransformNode;
use super::{LayerId, MovableId, NodeId};
use crate::foundation::collections::{DeferredBuffer, Mutation};
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use crate::foundation::time::GameTime;
use crate::render::{Camera, RenderError, Renderer};

/// Scene graph errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    /// The node handle is stale or was never issued
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// The movable handle is stale or was never issued
    #[error("unknown movable {0:?}")]
    UnknownMovable(MovableId),

    /// The layer handle is stale or was never issued
    #[error("unknown layer {0:?}")]
    UnknownLayer(LayerId),

    /// The root node lives as long as the graph
    #[error("the root node cannot be destroyed")]
    CannotDestroyRoot,
}

/// Where a node should end up once the update pass is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Relink {
    child: NodeId,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attachment {
    node: NodeId,
    movable: MovableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposal {
    Node(NodeId),
    Movable(MovableId),
}

#[derive(Debug)]
struct Monitor {
    capabilities: Capabilities,
    members: Vec<MovableId>,
}

/// Hierarchy of transform nodes with attached movables
pub struct SceneGraph {
    nodes: SlotMap<NodeId, TransformNode>,
    movables: SlotMap<MovableId, MovableSlot>,
    root: NodeId,
    live: Vec<MovableId>,
    monitors: Vec<Monitor>,
    layers: SlotMap<LayerId, Layer>,
    layer_order: Vec<LayerId>,
    events: EventDispatcher,
    pending_links: DeferredBuffer<Relink>,
    pending_attachments: DeferredBuffer<Attachment>,
    pending_disposals: DeferredBuffer<Disposal>,
    updating: bool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph containing only the root node
    ///
    /// [`Capabilities::RENDERABLE`] and [`Capabilities::UPDATABLE`] are
    /// monitored from the start.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TransformNode::new(Some("root".to_string())));

        Self {
            nodes,
            movables: SlotMap::with_key(),
            root,
            live: Vec::new(),
            monitors: vec![
                Monitor { capabilities: Capabilities::RENDERABLE, members: Vec::new() },
                Monitor { capabilities: Capabilities::UPDATABLE, members: Vec::new() },
            ],
            layers: SlotMap::with_key(),
            layer_order: Vec::new(),
            events: EventDispatcher::default(),
            pending_links: DeferredBuffer::new(),
            pending_attachments: DeferredBuffer::new(),
            pending_disposals: DeferredBuffer::new(),
            updating: false,
        }
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Result<&TransformNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Check if a node handle is still valid
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes including the root and detached nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a node in insertion order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(self.node(id)?.children())
    }

    /// Check if a node is reachable from the root
    pub fn is_node_live(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|node| node.parent);
        }
        false
    }

    /// Check if an update pass is running
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Allocate a detached node
    pub fn create_node(&mut self, name: Option<&str>) -> NodeId {
        self.nodes.insert(TransformNode::new(name.map(str::to_string)))
    }

    /// Allocate a node and make it a child of `parent`
    ///
    /// During an update pass the link is deferred like any other re-link.
    pub fn create_child(&mut self, parent: NodeId, name: Option<&str>) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let child = self.create_node(name);
        self.add_child(parent, child)?;
        Ok(child)
    }

    /// Make `child` a child of `parent`, detaching it from its old parent
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.reparent(child, Some(parent))
    }

    /// Detach a node from its parent; the subtree stays alive but leaves the scene
    pub fn remove_from_parent(&mut self, child: NodeId) -> Result<(), SceneError> {
        self.reparent(child, None)
    }

    /// Move a node under a new parent (or detach it with `None`)
    ///
    /// The representation that was valid before the move is kept: a node whose
    /// local transform is known keeps it and moves with its new parent, a node
    /// known only in world space stays where it is. Reparenting the root, or a
    /// node onto itself or one of its descendants, is ignored.
    ///
    /// During an update pass only the last request for a node is kept and it
    /// is applied as a single move once the pass is over.
    pub fn reparent(&mut self, child: NodeId, new_parent: Option<NodeId>) -> Result<(), SceneError> {
        let old_parent = self.node(child)?.parent;
        if let Some(parent) = new_parent {
            self.node(parent)?;
        }

        if old_parent != new_parent {
            if child == self.root {
                log::warn!("Ignoring attempt to reparent the root node");
                return Ok(());
            }
            if let Some(parent) = new_parent {
                if self.is_self_or_descendant(parent, child) {
                    log::warn!("Ignoring attempt to parent node {child:?} under itself or a descendant");
                    return Ok(());
                }
            }
        }

        if self.updating {
            // Later requests replace earlier ones; moving back home cancels.
            self.pending_links.discard(|relink| relink.child == child);
            if old_parent != new_parent {
                self.pending_links.queue_add(Relink { child, parent: new_parent });
            }
            return Ok(());
        }

        self.link(child, new_parent);
        Ok(())
    }

    /// Destroy a node, its descendants and every movable attached to them
    ///
    /// Attached movables are detached, unloaded and dropped.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.node(id)?;
        if id == self.root {
            return Err(SceneError::CannotDestroyRoot);
        }

        if self.updating {
            self.pending_disposals.queue_remove(Disposal::Node(id));
            return Ok(());
        }

        self.destroy_now(id);
        Ok(())
    }

    /// Destroy everything below the root
    pub fn clear(&mut self) {
        let children = self.nodes.get(self.root).map(|root| root.children.clone()).unwrap_or_default();
        for child in children {
            if let Err(err) = self.destroy_node(child) {
                log::warn!("Failed to destroy node while clearing scene: {err}");
            }
        }
    }

    fn is_self_or_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(candidate);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|node| node.parent);
        }
        false
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(node) = self.nodes.get(node_id) {
                visited.push(node_id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        visited
    }

    fn subtree_movables(&self, id: NodeId) -> Vec<MovableId> {
        self.subtree(id)
            .into_iter()
            .filter_map(|node_id| self.nodes.get(node_id))
            .flat_map(|node| node.movables.iter().copied())
            .collect()
    }

    fn link(&mut self, child: NodeId, new_parent: Option<NodeId>) {
        let Some(node) = self.nodes.get(child) else {
            return;
        };
        let old_parent = node.parent;
        if old_parent == new_parent {
            return;
        }

        let was_live = self.is_node_live(child);

        if node.state().has_local() {
            // The node keeps its local transform, so its world frame moves.
            self.secure_descendants(child);
            node.forget_global();
        }

        if let Some(old) = old_parent.and_then(|old| self.nodes.get_mut(old)) {
            old.children.retain(|id| *id != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = new_parent;
        }
        if let Some(parent) = new_parent.and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.push(child);
        }
        log::trace!("Linked node {child:?} from {old_parent:?} to {new_parent:?}");

        let is_live = self.is_node_live(child);
        if was_live != is_live {
            for movable in self.subtree_movables(child) {
                self.set_movable_live(movable, is_live);
            }
        }
    }

    fn destroy_now(&mut self, id: NodeId) {
        self.link(id, None);

        let subtree = self.subtree(id);
        for &node_id in subtree.iter().rev() {
            let movables = self.nodes.get(node_id).map(|node| node.movables.clone()).unwrap_or_default();
            for movable in movables {
                self.dispose_movable(movable);
            }
            self.nodes.remove(node_id);
        }

        self.pending_links.discard(|relink| {
            subtree.contains(&relink.child) || relink.parent.is_some_and(|parent| subtree.contains(&parent))
        });
        self.pending_attachments.discard(|attachment| subtree.contains(&attachment.node));
        self.pending_disposals.discard(|disposal| match disposal {
            Disposal::Node(node_id) => subtree.contains(node_id),
            Disposal::Movable(_) => false,
        });
        log::debug!("Destroyed {} node(s) starting at {id:?}", subtree.len());
    }

    // ---------------------------------------------------------------------
    // Movables
    // ---------------------------------------------------------------------

    /// Hand a movable to the graph without attaching it
    pub fn add_movable(&mut self, movable: Box<dyn Movable>) -> MovableId {
        self.movables.insert(MovableSlot::new(movable))
    }

    /// Hand a movable to the graph and attach it to `node`
    pub fn insert_movable(&mut self, node: NodeId, movable: Box<dyn Movable>) -> Result<MovableId, SceneError> {
        self.node(node)?;
        let id = self.add_movable(movable);
        self.attach_movable(node, id)?;
        Ok(id)
    }

    /// Attach a movable to a node, detaching it from its previous node first
    pub fn attach_movable(&mut self, node: NodeId, movable: MovableId) -> Result<(), SceneError> {
        self.node(node)?;
        if !self.movables.contains_key(movable) {
            return Err(SceneError::UnknownMovable(movable));
        }

        if self.updating {
            self.pending_attachments.queue_add(Attachment { node, movable });
        } else {
            self.apply_attach(node, movable);
        }
        Ok(())
    }

    /// Detach a movable from a node
    ///
    /// Detaching a movable that is not attached to `node` is ignored.
    pub fn detach_movable(&mut self, node: NodeId, movable: MovableId) -> Result<(), SceneError> {
        self.node(node)?;
        if !self.movables.contains_key(movable) {
            return Err(SceneError::UnknownMovable(movable));
        }

        if self.updating {
            self.pending_attachments.queue_remove(Attachment { node, movable });
        } else {
            self.apply_detach(node, movable);
        }
        Ok(())
    }

    /// Detach, unload and drop a movable
    pub fn remove_movable(&mut self, movable: MovableId) -> Result<(), SceneError> {
        if !self.movables.contains_key(movable) {
            return Err(SceneError::UnknownMovable(movable));
        }

        if self.updating {
            self.pending_disposals.queue_remove(Disposal::Movable(movable));
        } else {
            self.dispose_movable(movable);
        }
        Ok(())
    }

    /// Typed access to a movable
    pub fn movable<T: Movable>(&self, id: MovableId) -> Option<&T> {
        self.movable_dyn(id)?.as_any().downcast_ref::<T>()
    }

    /// Typed mutable access to a movable
    pub fn movable_mut<T: Movable>(&mut self, id: MovableId) -> Option<&mut T> {
        self.movables
            .get_mut(id)?
            .movable
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Untyped access to a movable
    ///
    /// Returns `None` while the movable is lent out to its own update call.
    pub fn movable_dyn(&self, id: MovableId) -> Option<&dyn Movable> {
        self.movables.get(id)?.movable.as_deref()
    }

    /// Node a movable is attached to
    pub fn movable_node(&self, id: MovableId) -> Option<NodeId> {
        self.movables.get(id)?.node
    }

    /// Check if a movable is attached below the root
    pub fn is_live(&self, id: MovableId) -> bool {
        self.movables.get(id).is_some_and(|slot| slot.live)
    }

    /// Number of movables owned by the graph
    pub fn movable_count(&self) -> usize {
        self.movables.len()
    }

    /// First movable of type `T` attached to `node`
    pub fn find_movable<T: Movable>(&self, node: NodeId) -> Option<MovableId> {
        self.nodes
            .get(node)?
            .movables
            .iter()
            .copied()
            .find(|&id| self.movable::<T>(id).is_some())
    }

    fn apply_attach(&mut self, node: NodeId, movable: MovableId) {
        let Some(current) = self.movables.get(movable).map(|slot| slot.node) else {
            return;
        };
        if current == Some(node) || !self.nodes.contains_key(node) {
            return;
        }
        if let Some(old) = current {
            self.apply_detach(old, movable);
        }

        if let Some(target) = self.nodes.get_mut(node) {
            target.movables.push(movable);
        }
        if let Some(slot) = self.movables.get_mut(movable) {
            slot.node = Some(node);
            if let Some(payload) = slot.movable.as_mut() {
                payload.on_attached(node);
            }
        }
        log::trace!("Attached movable {movable:?} to node {node:?}");

        if self.is_node_live(node) {
            self.set_movable_live(movable, true);
        }
    }

    fn apply_detach(&mut self, node: NodeId, movable: MovableId) {
        let attached_here = self.movables.get(movable).is_some_and(|slot| slot.node == Some(node));
        if !attached_here {
            log::warn!("Movable {movable:?} is not attached to node {node:?}, nothing to detach");
            return;
        }

        self.set_movable_live(movable, false);

        if let Some(owner) = self.nodes.get_mut(node) {
            owner.movables.retain(|id| *id != movable);
        }
        if let Some(slot) = self.movables.get_mut(movable) {
            slot.node = None;
            if let Some(payload) = slot.movable.as_mut() {
                payload.on_detached(node);
            }
        }
        log::trace!("Detached movable {movable:?} from node {node:?}");
    }

    fn dispose_movable(&mut self, movable: MovableId) {
        if let Some(node) = self.movable_node(movable) {
            self.apply_detach(node, movable);
        }
        if let Some(slot) = self.movables.remove(movable) {
            if let Some(mut payload) = slot.movable {
                payload.unload_content();
            }
        }
        self.pending_attachments.discard(|attachment| attachment.movable == movable);
    }

    fn set_movable_live(&mut self, id: MovableId, live: bool) {
        let Some(slot) = self.movables.get_mut(id) else {
            return;
        };
        if slot.live == live {
            return;
        }
        slot.live = live;
        let capabilities = slot.capabilities;
        let Some(node) = slot.node else {
            return;
        };

        if live {
            self.live.push(id);
            for monitor in &mut self.monitors {
                if capabilities.contains(monitor.capabilities) {
                    monitor.members.push(id);
                }
            }
            if capabilities.contains(Capabilities::RENDERABLE) {
                if let Some(payload) = slot.movable.as_deref() {
                    for layer in self.layers.values_mut() {
                        if layer.matches(payload) {
                            layer.insert(id);
                        }
                    }
                }
            }
        } else {
            self.live.retain(|member| *member != id);
            for monitor in &mut self.monitors {
                monitor.members.retain(|member| *member != id);
            }
            for layer in self.layers.values_mut() {
                layer.remove(id);
            }
        }

        let event = if live {
            SceneEvent::MovableAdded { movable: id, node }
        } else {
            SceneEvent::MovableRemoved { movable: id, node }
        };
        self.dispatch_event(id, &event);
    }

    fn dispatch_event(&mut self, id: MovableId, event: &SceneEvent) {
        if self.events.is_empty() {
            return;
        }
        let Some(mut payload) = self.movables.get_mut(id).and_then(|slot| slot.movable.take()) else {
            log::debug!("Movable {id:?} is busy, skipping {event:?}");
            return;
        };
        self.events.dispatch(event, payload.as_mut());
        if let Some(slot) = self.movables.get_mut(id) {
            slot.movable = Some(payload);
        }
    }

    // ---------------------------------------------------------------------
    // Monitors and events
    // ---------------------------------------------------------------------

    /// Start tracking live movables carrying all of `capabilities`
    ///
    /// Already live movables are picked up immediately. Registering the same
    /// capabilities twice has no effect.
    pub fn register_monitor(&mut self, capabilities: Capabilities) {
        if self.is_monitored(capabilities) {
            return;
        }

        let members: Vec<MovableId> = self
            .live
            .iter()
            .copied()
            .filter(|&id| {
                self.movables
                    .get(id)
                    .is_some_and(|slot| slot.capabilities.contains(capabilities))
            })
            .collect();
        log::debug!("Monitoring {capabilities:?} ({} live member(s))", members.len());
        self.monitors.push(Monitor { capabilities, members });
    }

    /// Check if a monitor exists for exactly these capabilities
    pub fn is_monitored(&self, capabilities: Capabilities) -> bool {
        self.monitors.iter().any(|monitor| monitor.capabilities == capabilities)
    }

    /// Live movables carrying `capabilities`, in the order they became live
    ///
    /// Empty if the capabilities were never registered as a monitor.
    pub fn collect(&self, capabilities: Capabilities) -> &[MovableId] {
        match self.monitors.iter().find(|monitor| monitor.capabilities == capabilities) {
            Some(monitor) => &monitor.members,
            None => {
                log::debug!("Collect on unregistered monitor {capabilities:?}");
                &[]
            }
        }
    }

    /// Register an observer; observers run in registration order
    pub fn add_event_handler(&mut self, handler: impl SceneEventHandler + 'static) {
        self.events.register(Box::new(handler));
    }

    // ---------------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------------

    /// Add a layer; live renderables accepted by its matcher join at once
    pub fn add_layer(&mut self, mut layer: Layer) -> LayerId {
        for &id in &self.live {
            let Some(slot) = self.movables.get(id) else {
                continue;
            };
            if !slot.capabilities.contains(Capabilities::RENDERABLE) {
                continue;
            }
            if slot.movable.as_deref().is_some_and(|payload| layer.matches(payload)) {
                layer.insert(id);
            }
        }

        log::debug!("Added layer '{}' at depth {} with {} member(s)", layer.name(), layer.depth(), layer.members().len());
        let id = self.layers.insert(layer);
        self.layer_order.push(id);
        id
    }

    /// Remove a layer
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, SceneError> {
        let layer = self.layers.remove(id).ok_or(SceneError::UnknownLayer(id))?;
        self.layer_order.retain(|layer_id| *layer_id != id);
        Ok(layer)
    }

    /// Look up a layer
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Add a live movable to a layer regardless of the layer's matcher
    ///
    /// Returns false if the movable is not live or already a member.
    pub fn add_renderable(&mut self, layer: LayerId, movable: MovableId) -> Result<bool, SceneError> {
        if !self.movables.contains_key(movable) {
            return Err(SceneError::UnknownMovable(movable));
        }
        let live = self.is_live(movable);
        let layer = self.layers.get_mut(layer).ok_or(SceneError::UnknownLayer(layer))?;
        if !live {
            log::warn!("Movable {movable:?} is not in the scene, not adding it to layer '{}'", layer.name());
            return Ok(false);
        }
        Ok(layer.insert(movable))
    }

    /// Remove a movable from a layer
    pub fn remove_renderable(&mut self, layer: LayerId, movable: MovableId) -> Result<bool, SceneError> {
        let layer = self.layers.get_mut(layer).ok_or(SceneError::UnknownLayer(layer))?;
        Ok(layer.remove(movable))
    }

    /// Members of a layer sorted back to front by their node's world Z
    pub fn layer_renderables(&self, layer: LayerId) -> Result<Vec<MovableId>, SceneError> {
        let layer = self.layers.get(layer).ok_or(SceneError::UnknownLayer(layer))?;

        let mut keyed: Vec<(f32, MovableId)> = layer
            .members()
            .iter()
            .filter_map(|&id| {
                let node = self.movable_node(id)?;
                Some((self.resolve_global(node).position.z, id))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(keyed.into_iter().map(|(_, id)| id).collect())
    }

    /// Draw every layer in ascending depth
    pub fn draw_layers(&self, camera: &dyn Camera, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        let mut order = self.layer_order.clone();
        order.sort_by_key(|id| self.layers.get(*id).map_or(0, Layer::depth));

        for layer in order {
            let Ok(members) = self.layer_renderables(layer) else {
                continue;
            };
            for id in members {
                let Some(slot) = self.movables.get(id) else {
                    continue;
                };
                if let (Some(payload), Some(node)) = (slot.movable.as_deref(), slot.node) {
                    payload.render(self, node, camera, renderer)?;
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Update pass
    // ---------------------------------------------------------------------

    /// Run one update pass
    ///
    /// Pending changes are applied, then the tree is walked from the root
    /// (children before the node's own movables) calling every updatable
    /// movable, then changes requested during the walk are applied.
    pub fn update(&mut self, time: &GameTime, camera: &dyn Camera) {
        self.apply_pending();

        self.updating = true;
        let root = self.root;
        self.update_subtree(root, time, camera);
        self.updating = false;

        self.apply_pending();
    }

    fn update_subtree(&mut self, id: NodeId, time: &GameTime, camera: &dyn Camera) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let children = node.children.clone();
        let movables = node.movables.clone();

        for child in children {
            self.update_subtree(child, time, camera);
        }

        for movable_id in movables {
            let Some(slot) = self.movables.get_mut(movable_id) else {
                continue;
            };
            if !slot.capabilities.contains(Capabilities::UPDATABLE) {
                continue;
            }
            let Some(mut payload) = slot.movable.take() else {
                continue;
            };

            payload.update(self, id, time, camera);

            if let Some(slot) = self.movables.get_mut(movable_id) {
                slot.movable = Some(payload);
            }
        }
    }

    /// Apply every deferred change; returns how many were applied
    ///
    /// Destruction runs first, then re-links, then attachment changes, so
    /// nothing queued during the pass is attached to a node that is about to
    /// be destroyed.
    fn apply_pending(&mut self) -> usize {
        let disposals: Vec<_> = self.pending_disposals.drain().collect();
        let mut applied = disposals.len();

        for mutation in disposals {
            match mutation {
                Mutation::Remove(Disposal::Node(id)) | Mutation::Add(Disposal::Node(id)) => {
                    if self.nodes.contains_key(id) && id != self.root {
                        self.destroy_now(id);
                    }
                }
                Mutation::Remove(Disposal::Movable(id)) | Mutation::Add(Disposal::Movable(id)) => {
                    if self.movables.contains_key(id) {
                        self.dispose_movable(id);
                    }
                }
            }
        }

        let links: Vec<_> = self.pending_links.drain().collect();
        let attachments: Vec<_> = self.pending_attachments.drain().collect();
        applied += links.len() + attachments.len();

        for mutation in links {
            let (Mutation::Add(Relink { child, parent }) | Mutation::Remove(Relink { child, parent })) = mutation;
            let valid = self.nodes.contains_key(child)
                && parent.map_or(true, |parent| {
                    self.nodes.contains_key(parent) && !self.is_self_or_descendant(parent, child)
                });
            if valid {
                self.link(child, parent);
            }
        }

        for mutation in attachments {
            match mutation {
                Mutation::Remove(Attachment { node, movable }) => self.apply_detach(node, movable),
                Mutation::Add(Attachment { node, movable }) => self.apply_attach(node, movable),
            }
        }

        if applied > 0 {
            log::trace!("Applied {applied} deferred scene change(s)");
        }
        applied
    }
}

// -------------------------------------------------------------------------
// Transforms
// -------------------------------------------------------------------------

impl SceneGraph {
    fn resolve_global(&self, id: NodeId) -> Transform {
        let Some(node) = self.nodes.get(id) else {
            return Transform::identity();
        };
        if let Some(global) = node.cached_global() {
            return global;
        }

        let local = node.cached_local().unwrap_or_default();
        let global = match node.parent {
            Some(parent) => self.resolve_global(parent).combine(&local),
            None => local,
        };
        node.remember_global(global);
        global
    }

    fn resolve_local(&self, id: NodeId) -> Transform {
        let Some(node) = self.nodes.get(id) else {
            return Transform::identity();
        };
        if let Some(local) = node.cached_local() {
            return local;
        }

        let global = node.cached_global().unwrap_or_default();
        let local = match node.parent {
            Some(parent) => self.resolve_global(parent).relative_to(&global),
            None => global,
        };
        node.remember_local(local);
        local
    }

    /// Before `id`'s world frame changes, pin every descendant to its local
    /// transform measured against the old frame.
    fn secure_descendants(&self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for &child in &node.children {
            self.resolve_local(child);
            self.secure_descendants(child);
            if let Some(child_node) = self.nodes.get(child) {
                child_node.forget_global();
            }
        }
    }

    /// World transform of a node
    pub fn global_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        self.node(id)?;
        Ok(self.resolve_global(id))
    }

    /// Transform of a node relative to its parent
    pub fn local_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        self.node(id)?;
        Ok(self.resolve_local(id))
    }

    /// Replace a node's world transform; children follow
    pub fn set_global_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node(id)?;
        self.secure_descendants(id);
        self.node(id)?.assign_global(transform);
        Ok(())
    }

    /// Replace a node's parent-relative transform; children follow
    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node(id)?;
        self.secure_descendants(id);
        self.node(id)?.assign_local(transform);
        Ok(())
    }

    /// World position
    pub fn position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.global_transform(id)?.position)
    }

    /// Set the world position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let mut global = self.global_transform(id)?;
        global.position = position;
        self.set_global_transform(id, global)
    }

    /// World orientation
    pub fn orientation(&self, id: NodeId) -> Result<Quat, SceneError> {
        Ok(self.global_transform(id)?.rotation)
    }

    /// Set the world orientation
    pub fn set_orientation(&mut self, id: NodeId, orientation: Quat) -> Result<(), SceneError> {
        let mut global = self.global_transform(id)?;
        global.rotation = orientation;
        self.set_global_transform(id, global)
    }

    /// World scale
    pub fn scale(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.global_transform(id)?.scale)
    }

    /// Set the world scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        let mut global = self.global_transform(id)?;
        global.scale = scale;
        self.set_global_transform(id, global)
    }

    /// Position relative to the parent
    pub fn local_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.local_transform(id)?.position)
    }

    /// Set the position relative to the parent
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let mut local = self.local_transform(id)?;
        local.position = position;
        self.set_local_transform(id, local)
    }

    /// Orientation relative to the parent
    pub fn local_orientation(&self, id: NodeId) -> Result<Quat, SceneError> {
        Ok(self.local_transform(id)?.rotation)
    }

    /// Set the orientation relative to the parent
    pub fn set_local_orientation(&mut self, id: NodeId, orientation: Quat) -> Result<(), SceneError> {
        let mut local = self.local_transform(id)?;
        local.rotation = orientation;
        self.set_local_transform(id, local)
    }

    /// Scale relative to the parent
    pub fn local_scale(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.local_transform(id)?.scale)
    }

    /// Set the scale relative to the parent
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        let mut local = self.local_transform(id)?;
        local.scale = scale;
        self.set_local_transform(id, local)
    }

    /// World matrix of a node, cached until the node's world frame changes
    pub fn transformation(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let node = self.node(id)?;
        if let Some(matrix) = node.cached_matrix() {
            return Ok(matrix);
        }
        let matrix = self.resolve_global(id).to_matrix();
        node.cache_matrix(matrix);
        Ok(matrix)
    }

    /// Replace a node's world transform with a matrix
    ///
    /// The matrix is decomposed into position, rotation and scale; it must not
    /// contain shear.
    pub fn set_transformation(&mut self, id: NodeId, matrix: &Mat4) -> Result<(), SceneError> {
        self.node(id)?;
        self.secure_descendants(id);
        let node = self.node(id)?;
        node.assign_global(Transform::from_matrix(matrix));
        node.cache_matrix(*matrix);
        Ok(())
    }

    /// Translate a node in world space
    pub fn move_by(&mut self, id: NodeId, delta: Vec3) -> Result<(), SceneError> {
        let position = self.position(id)?;
        self.set_position(id, position + delta)
    }

    /// Keep only the world transform, so the node stays in place when reparented
    pub fn transform_local_to_global(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.node(id)?;
        self.resolve_global(id);
        self.node(id)?.forget_local();
        Ok(())
    }
}
