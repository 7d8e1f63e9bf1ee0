//! Entity world

use log::{debug, error, warn};
use slotmap::SlotMap;

use super::{ControllerId, Entity, EntityController, EntityError, EntityId, WorldContext};
use crate::foundation::collections::{DeferredBuffer, Mutation};
use crate::foundation::time::GameTime;
use crate::physics::{BasicPhysicsWorld, PhysicsWorld};
use crate::render::camera::Camera;
use crate::scene::SceneGraph;

/// Requests made by entities and controllers during an update
///
/// They are handed to the world after each entity finishes updating and
/// take effect once the update pass is over.
#[derive(Default)]
pub struct WorldCommands {
    current: Option<EntityId>,
    spawned: Vec<Box<dyn Entity>>,
    removed: Vec<EntityId>,
    attached: Vec<(EntityId, Box<dyn EntityController>)>,
    detached: Vec<(EntityId, ControllerId)>,
}

impl WorldCommands {
    /// Entity currently being updated
    pub fn current(&self) -> Option<EntityId> {
        self.current
    }

    /// Add an entity to the world
    pub fn spawn(&mut self, entity: Box<dyn Entity>) {
        self.spawned.push(entity);
    }

    /// Remove an entity from the world
    pub fn remove(&mut self, entity: EntityId) {
        self.removed.push(entity);
    }

    /// Attach a controller to an entity
    pub fn attach_controller(&mut self, entity: EntityId, controller: Box<dyn EntityController>) {
        self.attached.push((entity, controller));
    }

    /// Detach a controller from an entity
    pub fn detach_controller(&mut self, entity: EntityId, controller: ControllerId) {
        self.detached.push((entity, controller));
    }

    /// Check if nothing was requested
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.removed.is_empty() && self.attached.is_empty() && self.detached.is_empty()
    }
}

struct EntitySlot {
    entity: Option<Box<dyn Entity>>,
    controllers: Vec<ControllerId>,
    added: bool,
}

struct ControllerSlot {
    controller: Option<Box<dyn EntityController>>,
    entity: EntityId,
    attached: bool,
}

/// Owns entities together with the scene graph and physics world they live in
///
/// Entities added or removed while the world is updating are queued and
/// applied once the pass is over, removals first. The same holds for
/// controllers.
pub struct EntityWorld {
    scene: SceneGraph,
    physics: Box<dyn PhysicsWorld>,
    entities: SlotMap<EntityId, EntitySlot>,
    order: Vec<EntityId>,
    pending: DeferredBuffer<EntityId>,
    controllers: SlotMap<ControllerId, ControllerSlot>,
    pending_controllers: DeferredBuffer<(EntityId, ControllerId)>,
    updating: bool,
}

impl Default for EntityWorld {
    fn default() -> Self {
        Self::new(Box::new(BasicPhysicsWorld::new()))
    }
}

impl EntityWorld {
    /// Create an empty world around a physics backend
    pub fn new(physics: Box<dyn PhysicsWorld>) -> Self {
        Self::with_scene(SceneGraph::new(), physics)
    }

    /// Create an empty world around an existing scene graph
    pub fn with_scene(scene: SceneGraph, physics: Box<dyn PhysicsWorld>) -> Self {
        Self {
            scene,
            physics,
            entities: SlotMap::with_key(),
            order: Vec::new(),
            pending: DeferredBuffer::new(),
            controllers: SlotMap::with_key(),
            pending_controllers: DeferredBuffer::new(),
            updating: false,
        }
    }

    /// Scene graph
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mutable scene graph
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Physics backend
    pub fn physics(&self) -> &dyn PhysicsWorld {
        self.physics.as_ref()
    }

    /// Mutable physics backend
    pub fn physics_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.physics.as_mut()
    }

    /// Borrow the scene and physics together
    pub fn context(&mut self) -> WorldContext<'_> {
        WorldContext {
            scene: &mut self.scene,
            physics: self.physics.as_mut(),
        }
    }

    /// Check if an update pass is running
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Entities in the world, in the order they were added
    pub fn entities(&self) -> &[EntityId] {
        &self.order
    }

    /// Number of entities in the world
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the world has no entities
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if an entity is in the world or waiting to be added
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Check if an entity has been added (its content is loaded)
    pub fn is_added(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|slot| slot.added)
    }

    /// Add an entity, loading its content
    ///
    /// While updating, loading happens after the pass.
    pub fn add(&mut self, entity: Box<dyn Entity>) -> Result<EntityId, EntityError> {
        let id = self.entities.insert(EntitySlot {
            entity: Some(entity),
            controllers: Vec::new(),
            added: false,
        });

        if self.updating {
            self.pending.queue_add(id);
        } else {
            self.activate(id)?;
        }
        Ok(id)
    }

    /// Remove an entity, unloading its content and dropping its controllers
    ///
    /// While updating, removal happens after the pass.
    pub fn remove(&mut self, id: EntityId) -> Result<(), EntityError> {
        if !self.entities.contains_key(id) {
            return Err(EntityError::UnknownEntity(id));
        }

        if !self.updating {
            return self.deactivate(id);
        }

        if self.pending.is_pending_add(&id) {
            self.pending.queue_remove(id);
            self.pending_controllers.discard(|(entity, _)| *entity == id);
            self.drop_slot(id);
        } else {
            self.pending.queue_remove(id);
        }
        Ok(())
    }

    /// Remove every entity
    pub fn clear(&mut self) {
        self.pending.clear();
        self.pending_controllers.clear();
        for id in self.order.clone().into_iter().rev() {
            if let Err(err) = self.deactivate(id) {
                warn!("Failed to remove entity during clear: {}", err);
            }
        }
        self.entities.clear();
        self.controllers.clear();
    }

    /// Typed access to an entity
    pub fn entity<T: Entity>(&self, id: EntityId) -> Option<&T> {
        self.entity_dyn(id)?.as_any().downcast_ref::<T>()
    }

    /// Typed mutable access to an entity
    pub fn entity_mut<T: Entity>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities
            .get_mut(id)?
            .entity
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Untyped access to an entity
    pub fn entity_dyn(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(id)?.entity.as_deref()
    }

    /// First entity with the given name
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.entity_dyn(*id).is_some_and(|entity| entity.name() == name))
    }

    /// Run `f` with a typed entity and the world context
    ///
    /// Lets callers mutate an entity that needs the scene or physics, such
    /// as carving terrain, without borrowing the world twice.
    pub fn with_entity<T: Entity, R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut T, &mut WorldContext<'_>) -> R,
    ) -> Result<R, EntityError> {
        let mut entity = self.take_entity(id).ok_or(EntityError::UnknownEntity(id))?;

        let result = match entity.as_any_mut().downcast_mut::<T>() {
            Some(typed) => {
                let mut ctx = WorldContext {
                    scene: &mut self.scene,
                    physics: self.physics.as_mut(),
                };
                Ok(f(typed, &mut ctx))
            }
            None => Err(EntityError::UnknownEntity(id)),
        };

        self.restore_entity(id, entity);
        result
    }

    /// Attach a controller to an entity
    ///
    /// While updating, the controller starts running on the next pass.
    pub fn attach_controller(
        &mut self,
        entity: EntityId,
        controller: Box<dyn EntityController>,
    ) -> Result<ControllerId, EntityError> {
        if !self.entities.contains_key(entity) {
            return Err(EntityError::UnknownEntity(entity));
        }

        let id = self.controllers.insert(ControllerSlot {
            controller: Some(controller),
            entity,
            attached: false,
        });
        if self.updating {
            self.pending_controllers.queue_add((entity, id));
        } else {
            self.link_controller(entity, id);
        }
        Ok(id)
    }

    /// Detach a controller from its entity and drop it
    pub fn detach_controller(&mut self, entity: EntityId, controller: ControllerId) -> Result<(), EntityError> {
        match self.controllers.get(controller) {
            Some(slot) if slot.entity == entity => {}
            _ => return Err(EntityError::UnknownController(controller)),
        }

        if self.updating {
            if self.pending_controllers.is_pending_add(&(entity, controller)) {
                self.pending_controllers.queue_remove((entity, controller));
                self.controllers.remove(controller);
            } else {
                self.pending_controllers.queue_remove((entity, controller));
            }
        } else {
            self.unlink_controller(entity, controller);
        }
        Ok(())
    }

    /// Controllers attached to an entity, in update order
    pub fn controllers(&self, entity: EntityId) -> Result<&[ControllerId], EntityError> {
        self.entities
            .get(entity)
            .map(|slot| slot.controllers.as_slice())
            .ok_or(EntityError::UnknownEntity(entity))
    }

    /// Typed access to a controller
    pub fn controller<T: EntityController>(&self, id: ControllerId) -> Option<&T> {
        self.controllers
            .get(id)?
            .controller
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// First controller of type `T` attached to an entity
    pub fn find_controller<T: EntityController>(&self, entity: EntityId) -> Option<ControllerId> {
        self.entities
            .get(entity)?
            .controllers
            .iter()
            .copied()
            .find(|id| self.controller::<T>(*id).is_some())
    }

    /// Run one update pass
    ///
    /// Queued changes are applied, physical state is prepared and the
    /// physics world stepped, each entity is updated after its controllers,
    /// changes requested during the pass are applied, and finally the scene
    /// graph is updated.
    pub fn update(&mut self, time: &GameTime, camera: &dyn Camera) {
        self.apply_pending();

        self.updating = true;
        let snapshot = self.order.clone();

        for &id in &snapshot {
            let Some(mut entity) = self.take_entity(id) else {
                continue;
            };
            if entity.is_active() {
                entity.update_physics(&mut self.context(), time);
            }
            self.restore_entity(id, entity);
        }

        self.physics.step(time.delta);

        let mut commands = WorldCommands::default();
        for &id in &snapshot {
            self.update_entity(id, &mut commands, time);
            self.absorb(&mut commands);
        }
        self.updating = false;

        self.apply_pending();
        self.scene.update(time, camera);
    }

    fn update_entity(&mut self, id: EntityId, commands: &mut WorldCommands, time: &GameTime) {
        let Some(mut entity) = self.take_entity(id) else {
            return;
        };
        if !entity.is_active() {
            self.restore_entity(id, entity);
            return;
        }

        commands.current = Some(id);
        let controllers = self
            .entities
            .get(id)
            .map(|slot| slot.controllers.clone())
            .unwrap_or_default();

        for controller_id in controllers {
            let Some(mut controller) = self
                .controllers
                .get_mut(controller_id)
                .and_then(|slot| slot.controller.take())
            else {
                continue;
            };

            controller.update(entity.as_mut(), &mut self.context(), commands, time);

            if let Some(slot) = self.controllers.get_mut(controller_id) {
                slot.controller = Some(controller);
            }
        }

        entity.update(&mut self.context(), commands, time);
        commands.current = None;
        self.restore_entity(id, entity);
    }

    fn absorb(&mut self, commands: &mut WorldCommands) {
        for id in std::mem::take(&mut commands.removed) {
            if let Err(err) = self.remove(id) {
                warn!("Ignoring removal request: {}", err);
            }
        }
        for entity in std::mem::take(&mut commands.spawned) {
            if let Err(err) = self.add(entity) {
                error!("Failed to spawn entity: {}", err);
            }
        }
        for (entity, controller) in std::mem::take(&mut commands.detached) {
            if let Err(err) = self.detach_controller(entity, controller) {
                warn!("Ignoring controller detach request: {}", err);
            }
        }
        for (entity, controller) in std::mem::take(&mut commands.attached) {
            if let Err(err) = self.attach_controller(entity, controller) {
                warn!("Ignoring controller attach request: {}", err);
            }
        }
    }

    fn apply_pending(&mut self) {
        if self.pending.is_empty() && self.pending_controllers.is_empty() {
            return;
        }
        debug!(
            "Applying {} entity and {} controller changes",
            self.pending.len(),
            self.pending_controllers.len()
        );

        let changes: Vec<_> = self.pending.drain().collect();
        for change in changes {
            let result = match change {
                Mutation::Remove(id) => self.deactivate(id),
                Mutation::Add(id) => self.activate(id),
            };
            if let Err(err) = result {
                error!("Deferred entity change failed: {}", err);
            }
        }

        let changes: Vec<_> = self.pending_controllers.drain().collect();
        for change in changes {
            match change {
                Mutation::Remove((entity, controller)) => self.unlink_controller(entity, controller),
                Mutation::Add((entity, controller)) => self.link_controller(entity, controller),
            }
        }
    }

    fn activate(&mut self, id: EntityId) -> Result<(), EntityError> {
        let Some(mut entity) = self.take_entity(id) else {
            return Err(EntityError::UnknownEntity(id));
        };

        if let Err(err) = entity.load_content(&mut self.context()) {
            error!("Failed to load entity '{}': {}", entity.name(), err);
            self.drop_slot(id);
            return Err(err);
        }

        debug!("Added entity '{}'", entity.name());
        self.restore_entity(id, entity);
        if let Some(slot) = self.entities.get_mut(id) {
            slot.added = true;
        }
        self.order.push(id);
        Ok(())
    }

    fn deactivate(&mut self, id: EntityId) -> Result<(), EntityError> {
        let Some(slot) = self.entities.get(id) else {
            return Err(EntityError::UnknownEntity(id));
        };
        let was_added = slot.added;
        for controller in slot.controllers.clone() {
            self.unlink_controller(id, controller);
        }
        self.order.retain(|entity| *entity != id);

        let Some(mut entity) = self.take_entity(id) else {
            self.drop_slot(id);
            return Ok(());
        };
        let result = if was_added {
            entity.unload_content(&mut self.context())
        } else {
            Ok(())
        };
        debug!("Removed entity '{}'", entity.name());
        self.drop_slot(id);
        result
    }

    fn link_controller(&mut self, entity: EntityId, controller: ControllerId) {
        let Some(mut boxed) = self
            .controllers
            .get_mut(controller)
            .and_then(|slot| slot.controller.take())
        else {
            return;
        };
        let Some(mut target) = self.take_entity(entity) else {
            debug!("Dropping controller for missing entity {:?}", entity);
            self.controllers.remove(controller);
            return;
        };

        boxed.on_attached(target.as_mut());
        self.restore_entity(entity, target);

        if let Some(slot) = self.entities.get_mut(entity) {
            slot.controllers.push(controller);
        }
        if let Some(slot) = self.controllers.get_mut(controller) {
            slot.controller = Some(boxed);
            slot.attached = true;
        }
    }

    fn unlink_controller(&mut self, entity: EntityId, controller: ControllerId) {
        let Some(slot) = self.controllers.remove(controller) else {
            return;
        };
        if let Some(owner) = self.entities.get_mut(entity) {
            owner.controllers.retain(|id| *id != controller);
        }

        let (Some(mut boxed), true) = (slot.controller, slot.attached) else {
            return;
        };
        if let Some(mut target) = self.take_entity(entity) {
            boxed.on_detached(target.as_mut());
            self.restore_entity(entity, target);
        }
    }

    fn take_entity(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        self.entities.get_mut(id)?.entity.take()
    }

    fn restore_entity(&mut self, id: EntityId, entity: Box<dyn Entity>) {
        if let Some(slot) = self.entities.get_mut(id) {
            slot.entity = Some(entity);
        }
    }

    fn drop_slot(&mut self, id: EntityId) {
        if let Some(slot) = self.entities.remove(id) {
            for controller in slot.controllers {
                self.controllers.remove(controller);
            }
        }
    }
}
