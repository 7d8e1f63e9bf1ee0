//! # Carve Engine
//!
//! A scene graph and destructible quadtree terrain for 2D games.
//!
//! ## Features
//!
//! - **Scene Graph**: Transform hierarchy with lazily resolved local/global transforms
//! - **Movables**: Capability-tagged payloads with live collections, layers and events
//! - **Destructible Terrain**: Grids of region quadtrees carved by circle and rectangle brushes
//! - **Entity World**: Entities and controllers with deferred add/remove
//! - **Collaborators**: Physics, renderer and camera behind small traits, with in-memory backends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carve_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut world = EntityWorld::default();
//!     let terrain = world.add(Box::new(Terrain::new(TerrainConfig::default())?))?;
//!
//!     world.with_entity::<Terrain, _>(terrain, |terrain, ctx| {
//!         terrain.set_quads(ctx, &CircleBrush::at(Vec2::new(64.0, 64.0), 12.0), false, false)
//!     })??;
//!
//!     let camera = OrthographicCamera::new(CameraConfig::default());
//!     world.update(&GameTime::new(0.0, 1.0 / 60.0), &camera);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod spatial;
pub mod terrain;
pub mod physics;
pub mod render;
pub mod entity;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{CameraConfig, Config, ConfigError, TerrainConfig},
        entity::{Entity, EntityController, EntityError, EntityId, EntityWorld, PhysicalEntity, WorldCommands, WorldContext},
        foundation::{
            math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4},
            time::{GameTime, Timer},
        },
        physics::{BasicPhysicsWorld, BodyHandle, BodyKind, CollisionCategory, PhysicsWorld},
        render::{Camera, ColorVertex, HeadlessRenderer, OrthographicCamera, Renderer},
        scene::{Capabilities, Movable, NodeId, SceneError, SceneGraph},
        spatial::{Aabb2, CircleBrush, RectangleBrush, TerrainBrush},
        terrain::{Terrain, TerrainError, TerrainStats},
    };
}
