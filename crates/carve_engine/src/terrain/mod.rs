//! Destructible terrain
//!
//! The terrain is a grid of square blocks. Each block is a [`QuadTree`] with
//! its own scene node, static physics body and cached quad geometry. Brush
//! edits are routed to the blocks the brush can reach.

mod block;
mod geometry;
mod grid;

pub use block::QuadTree;
pub use geometry::QuadGeometry;
pub use grid::{Terrain, TerrainStats};

use thiserror::Error;

use crate::physics::PhysicsError;
use crate::render::RenderError;
use crate::scene::SceneError;

/// Terrain errors
#[derive(Debug, Error, PartialEq)]
pub enum TerrainError {
    /// Block size must be a positive, finite number
    #[error("invalid block size {0}")]
    InvalidBlockSize(f32),

    /// Terrain extent must be positive on both axes
    #[error("invalid terrain size {width} x {height}")]
    InvalidTerrainSize {
        /// Requested width
        width: f32,
        /// Requested height
        height: f32,
    },

    /// Terrain extent is not a whole number of blocks
    #[error("terrain {axis} {extent} is not divisible by block size {block_size}")]
    NotDivisible {
        /// "width" or "height"
        axis: &'static str,
        /// Extent along that axis
        extent: f32,
        /// Configured block size
        block_size: f32,
    },

    /// Subdivision depth is beyond what the engine supports
    #[error("max depth {depth} exceeds the supported maximum {max}")]
    DepthTooLarge {
        /// Requested depth
        depth: u32,
        /// Supported maximum
        max: u32,
    },

    /// The terrain has no blocks yet
    #[error("terrain is not loaded")]
    NotLoaded,

    /// The terrain already has blocks
    #[error("terrain is already loaded")]
    AlreadyLoaded,

    /// Scene graph failure
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Renderer failure
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Physics backend failure
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),
}
