//! Entity controllers

use std::any::Any;

use super::{Entity, WorldCommands, WorldContext};
use crate::foundation::time::GameTime;

/// Behaviour attached to an entity, like handling player input
///
/// A controller belongs to at most one entity and is updated right before it.
pub trait EntityController: Any {
    /// Drive the entity for one update
    fn update(
        &mut self,
        entity: &mut dyn Entity,
        ctx: &mut WorldContext<'_>,
        commands: &mut WorldCommands,
        time: &GameTime,
    );

    /// Called once the controller is attached
    fn on_attached(&mut self, _entity: &mut dyn Entity) {}

    /// Called once the controller is detached, before it is dropped
    fn on_detached(&mut self, _entity: &mut dyn Entity) {}

    /// Upcast for typed access
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed mutable access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
