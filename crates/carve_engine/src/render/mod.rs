//! # Rendering collaborator
//!
//! The engine does not own a graphics pipeline. It hands vertex and index
//! arrays to a [`Renderer`], keeps the returned [`BufferHandle`]s, and issues
//! indexed triangle-list draws with a world matrix and a flat color.
//!
//! - **Renderer**: buffer upload, release and indexed draws
//! - **Camera**: projection and view matrices plus pointer unprojection
//! - **HeadlessRenderer**: a backend that only records what it was asked to do

pub mod camera;
pub mod headless;

pub use camera::{Camera, OrthographicCamera, Viewport};
pub use headless::{DrawCall, HeadlessRenderer};

use bytemuck::{Pod, Zeroable};
use slotmap::new_key_type;
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec4};

new_key_type! {
    /// Handle to an uploaded vertex/index buffer pair
    pub struct BufferHandle;
}

/// Position + color vertex, laid out for direct upload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    /// Position in world or model space
    pub position: [f32; 3],

    /// RGBA color
    pub color: [f32; 4],
}

impl ColorVertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

/// Rendering errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The buffer handle is stale or was never issued
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferHandle),

    /// Index data refers past the end of the vertex data
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Number of uploaded vertices
        vertex_count: usize,
    },

    /// Backend specific failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Operations the engine needs from a graphics device
pub trait Renderer {
    /// Upload vertex and index data, returning a handle for later draws
    fn upload(&mut self, vertices: &[ColorVertex], indices: &[u32]) -> Result<BufferHandle, RenderError>;

    /// Release an uploaded buffer
    fn release(&mut self, buffer: BufferHandle) -> Result<(), RenderError>;

    /// Draw an uploaded buffer as an indexed triangle list
    fn draw_indexed(&mut self, buffer: BufferHandle, transform: &Mat4, color: Vec4) -> Result<(), RenderError>;
}
