//! Entity backed by a physics body

use std::any::Any;

use log::{debug, warn};

use super::{Entity, EntityError, WorldCommands, WorldContext};
use crate::foundation::math::{rotation_z, Vec2, Vec3};
use crate::foundation::time::GameTime;
use crate::physics::{BodyHandle, BodyKind, CollisionCategory, PhysicsWorld};
use crate::scene::NodeId;

/// A box-shaped body whose scene node follows the simulation
///
/// Position and rotation set before loading are remembered and applied to
/// the body once it exists. Afterwards the body is authoritative and the
/// node is synced from it every update.
#[derive(Debug, Clone)]
pub struct PhysicalEntity {
    name: String,
    kind: BodyKind,
    size: Vec2,
    category: CollisionCategory,
    position: Vec2,
    rotation: f32,
    active: bool,
    node: Option<NodeId>,
    body: Option<BodyHandle>,
}

impl PhysicalEntity {
    /// Create an unloaded entity with a `size` box fixture
    pub fn new(name: impl Into<String>, kind: BodyKind, size: Vec2) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            category: CollisionCategory::default(),
            position: Vec2::zeros(),
            rotation: 0.0,
            active: true,
            node: None,
            body: None,
        }
    }

    /// Builder method to set the starting position
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Builder method to set the fixture's collision category
    pub fn with_category(mut self, category: CollisionCategory) -> Self {
        self.category = category;
        self
    }

    /// Body handle, once loaded
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Current position, read from the body when there is one
    pub fn position(&self, physics: &dyn PhysicsWorld) -> Vec2 {
        self.body
            .and_then(|body| physics.body_transform(body))
            .map_or(self.position, |(position, _)| position)
    }

    /// Current rotation in radians
    pub fn rotation(&self, physics: &dyn PhysicsWorld) -> f32 {
        self.body
            .and_then(|body| physics.body_transform(body))
            .map_or(self.rotation, |(_, rotation)| rotation)
    }

    /// Teleport the entity
    pub fn set_transform(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        position: Vec2,
        rotation: f32,
    ) -> Result<(), EntityError> {
        match self.body {
            Some(body) => physics.set_body_transform(body, position, rotation)?,
            None => {
                self.position = position;
                self.rotation = rotation;
            }
        }
        Ok(())
    }

    /// Enable or disable updates
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn sync_node(&self, ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        let (Some(node), Some(body)) = (self.node, self.body) else {
            return Ok(());
        };
        let Some((position, rotation)) = ctx.physics.body_transform(body) else {
            return Ok(());
        };

        let z = ctx.scene.position(node)?.z;
        ctx.scene.set_position(node, Vec3::new(position.x, position.y, z))?;
        ctx.scene.set_orientation(node, rotation_z(rotation))?;
        Ok(())
    }
}

impl Entity for PhysicalEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn node(&self) -> Option<NodeId> {
        self.node
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn load_content(&mut self, ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        let root = ctx.scene.root();
        let node = ctx.scene.create_child(root, Some(self.name.as_str()))?;
        self.node = Some(node);

        let body = ctx.physics.create_body(self.kind, self.position);
        self.body = Some(body);
        ctx.physics.set_body_transform(body, self.position, self.rotation)?;
        ctx.physics
            .attach_rectangle_fixture(body, self.size.x, self.size.y, Vec2::zeros(), self.category)?;

        debug!("Loaded physical entity '{}' at {:?}", self.name, self.position);
        self.sync_node(ctx)
    }

    fn unload_content(&mut self, ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        if let Some(body) = self.body.take() {
            if let Some((position, rotation)) = ctx.physics.body_transform(body) {
                self.position = position;
                self.rotation = rotation;
            }
            ctx.physics.dispose_body(body)?;
        }
        if let Some(node) = self.node.take() {
            ctx.scene.destroy_node(node)?;
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut WorldContext<'_>, _commands: &mut WorldCommands, _time: &GameTime) {
        if let Err(err) = self.sync_node(ctx) {
            warn!("Failed to sync '{}' with its body: {}", self.name, err);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
