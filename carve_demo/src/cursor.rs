//! Spinning marker drawn where the brush paints

use std::any::Any;

use carve_engine::foundation::math::{rotation_z, Vec4};
use carve_engine::foundation::time::GameTime;
use carve_engine::render::{BufferHandle, Camera, ColorVertex, RenderError, Renderer};
use carve_engine::scene::{Capabilities, Movable, NodeId, SceneGraph};

/// Indices of the marker quad
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 3, 0, 2];

/// Square marker vertices centered on the origin
pub fn quad_vertices(half_size: f32) -> [ColorVertex; 4] {
    let white = [1.0, 1.0, 1.0, 1.0];
    [
        ColorVertex::new([-half_size, -half_size, 0.0], white),
        ColorVertex::new([half_size, -half_size, 0.0], white),
        ColorVertex::new([half_size, half_size, 0.0], white),
        ColorVertex::new([-half_size, half_size, 0.0], white),
    ]
}

/// Renderable, updatable marker
pub struct Cursor {
    buffer: BufferHandle,
    color: Vec4,
    spin: f32,
}

impl Cursor {
    /// Marker drawing `buffer`, turning `spin` radians per second
    pub fn new(buffer: BufferHandle, spin: f32) -> Self {
        Self {
            buffer,
            color: Vec4::new(1.0, 1.0, 0.0, 1.0),
            spin,
        }
    }
}

impl Movable for Cursor {
    fn name(&self) -> &str {
        "cursor"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RENDERABLE | Capabilities::UPDATABLE
    }

    fn update(&mut self, scene: &mut SceneGraph, node: NodeId, time: &GameTime, _camera: &dyn Camera) {
        if let Err(err) = scene.set_local_orientation(node, rotation_z(time.elapsed * self.spin)) {
            log::warn!("Cursor lost its node: {}", err);
        }
    }

    fn render(
        &self,
        scene: &SceneGraph,
        node: NodeId,
        _camera: &dyn Camera,
        renderer: &mut dyn Renderer,
    ) -> Result<(), RenderError> {
        let Ok(transform) = scene.transformation(node) else {
            return Ok(());
        };
        renderer.draw_indexed(self.buffer, &transform, self.color)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
