//! Physics collaborator
//!
//! The engine never simulates anything itself. Terrain and physical entities
//! talk to a [`PhysicsWorld`] backend through opaque body and fixture handles.

pub mod basic;

pub use basic::{BasicPhysicsWorld, Body, Fixture};

use bitflags::bitflags;
use slotmap::new_key_type;
use thiserror::Error;

use crate::foundation::math::Vec2;

new_key_type! {
    /// Handle to a rigid body owned by a physics backend
    pub struct BodyHandle;
    /// Handle to a collision fixture attached to a body
    pub struct FixtureHandle;
}

bitflags! {
    /// Collision categories used for fixture filtering
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionCategory: u32 {
        /// Anything without a more specific category
        const DEFAULT = 1 << 0;
        /// Solid terrain quads
        const TERRAIN = 1 << 1;
        /// Player-controlled bodies
        const PLAYER = 1 << 2;
        /// Short-lived projectiles
        const PROJECTILE = 1 << 3;
    }
}

impl Default for CollisionCategory {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves; terrain bodies are static
    Static,
    /// Moved only by the caller
    Kinematic,
    /// Integrated by the backend
    Dynamic,
}

/// Physics backend errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhysicsError {
    /// The body handle is stale or was never issued
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),

    /// The fixture handle is stale or was never issued
    #[error("unknown fixture {0:?}")]
    UnknownFixture(FixtureHandle),
}

/// Operations the engine needs from a physics engine
pub trait PhysicsWorld {
    /// Create a body at a world position
    fn create_body(&mut self, kind: BodyKind, position: Vec2) -> BodyHandle;

    /// Attach an axis-aligned rectangle centered at `offset` in body space
    fn attach_rectangle_fixture(
        &mut self,
        body: BodyHandle,
        width: f32,
        height: f32,
        offset: Vec2,
        category: CollisionCategory,
    ) -> Result<FixtureHandle, PhysicsError>;

    /// Destroy one fixture
    fn destroy_fixture(&mut self, fixture: FixtureHandle) -> Result<(), PhysicsError>;

    /// Destroy a body together with all of its fixtures
    fn dispose_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError>;

    /// Position and rotation (radians) of a body
    fn body_transform(&self, body: BodyHandle) -> Option<(Vec2, f32)>;

    /// Teleport a body
    fn set_body_transform(&mut self, body: BodyHandle, position: Vec2, rotation: f32) -> Result<(), PhysicsError>;

    /// Number of fixtures attached to a body
    fn fixture_count(&self, body: BodyHandle) -> usize;

    /// Advance the simulation
    fn step(&mut self, dt: f32);
}
