//! Entities and the world that drives them
//!
//! An entity binds scene nodes, physics bodies and behaviour into one object.
//! Controllers attach to entities and run right before them every update.
//! The [`EntityWorld`] owns the scene graph and physics world they share.

mod controller;
mod physical;
mod world;

use std::any::Any;

use slotmap::new_key_type;
use thiserror::Error;

pub use controller::EntityController;
pub use physical::PhysicalEntity;
pub use world::{EntityWorld, WorldCommands};

use crate::foundation::time::GameTime;
use crate::physics::{PhysicsError, PhysicsWorld};
use crate::scene::{NodeId, SceneError, SceneGraph};
use crate::terrain::TerrainError;

new_key_type! {
    /// Handle to an entity in an [`EntityWorld`]
    pub struct EntityId;
    /// Handle to a controller in an [`EntityWorld`]
    pub struct ControllerId;
}

/// Entity errors
#[derive(Debug, Error, PartialEq)]
pub enum EntityError {
    /// The entity handle is stale or was never issued
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    /// The controller handle is stale or belongs to another entity
    #[error("unknown controller {0:?}")]
    UnknownController(ControllerId),

    /// Scene graph failure
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Physics backend failure
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Terrain failure
    #[error("terrain error: {0}")]
    Terrain(#[from] TerrainError),
}

/// Borrowed view of the shared world state
pub struct WorldContext<'a> {
    /// Scene graph of the world
    pub scene: &'a mut SceneGraph,
    /// Physics backend of the world
    pub physics: &'a mut dyn PhysicsWorld,
}

/// Object living in an [`EntityWorld`]
pub trait Entity: Any {
    /// Optional name used in logs
    fn name(&self) -> &str {
        ""
    }

    /// Scene node representing the entity, once loaded
    fn node(&self) -> Option<NodeId> {
        None
    }

    /// Inactive entities keep their place in the world but are not updated
    fn is_active(&self) -> bool {
        true
    }

    /// Called when the entity enters the world
    fn load_content(&mut self, _ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        Ok(())
    }

    /// Called when the entity leaves the world
    fn unload_content(&mut self, _ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        Ok(())
    }

    /// Called before the physics step
    fn update_physics(&mut self, _ctx: &mut WorldContext<'_>, _time: &GameTime) {}

    /// Called once per update after the physics step and the entity's controllers
    fn update(&mut self, _ctx: &mut WorldContext<'_>, _commands: &mut WorldCommands, _time: &GameTime) {}

    /// Upcast for typed access
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed mutable access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
