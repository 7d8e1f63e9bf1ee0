//! # Camera
//!
//! Cameras expose their projection and view matrices plus enough viewport
//! information for editing tools to turn a pointer position into a world
//! position (for example to center a terrain brush under the cursor).
//!
//! ## Coordinate System
//! The world is 2-D with Y growing downwards on screen. The orthographic
//! camera therefore passes `bottom = +h/2` and `top = -h/2` to its projection.

use crate::config::CameraConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec4};

/// Pixel rectangle a camera renders into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: f32,
    /// Top edge in pixels
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Viewport {
    /// Create a viewport anchored at the window origin
    pub fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    /// Width divided by height, 1.0 for degenerate viewports
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 { self.width / self.height } else { 1.0 }
    }
}

/// Operations the engine needs from a camera
pub trait Camera {
    /// Projection and view matrices, in that order
    fn matrices(&self) -> (Mat4, Mat4);

    /// Size of the render target in pixels
    fn screen_size(&self) -> Vec2;

    /// Viewport the camera renders into
    fn viewport(&self) -> Viewport;

    /// Map a screen position in pixels to a world position on the Z = 0 plane
    fn unproject(&self, screen: Vec2) -> Vec2 {
        let viewport = self.viewport();
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Vec2::zeros();
        }

        let ndc_x = (screen.x - viewport.x) / viewport.width * 2.0 - 1.0;
        let ndc_y = 1.0 - (screen.y - viewport.y) / viewport.height * 2.0;

        let (projection, view) = self.matrices();
        let Some(inverse) = (projection * view).try_inverse() else {
            log::warn!("Camera matrices are not invertible, cannot unproject");
            return Vec2::zeros();
        };

        let world = inverse * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        if world.w.abs() <= f32::EPSILON {
            return Vec2::new(world.x, world.y);
        }
        Vec2::new(world.x / world.w, world.y / world.w)
    }
}

/// Orthographic 2-D camera
///
/// Shows `view_height` world units vertically; the horizontal extent follows
/// the viewport aspect ratio. The view matrix is the inverse of the world
/// transform the camera follows, usually a scene node's world matrix.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    config: CameraConfig,
    world: Mat4,
}

impl OrthographicCamera {
    /// Create a camera at the world origin
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            world: Mat4::identity(),
        }
    }

    /// Follow a world transform; the camera looks at its origin
    pub fn follow(&mut self, world: &Mat4) {
        self.world = *world;
    }

    /// Center the camera on a world position without rotation
    pub fn look_at(&mut self, position: Vec2) {
        self.world = Mat4::new_translation(&position.push(0.0));
    }

    /// Resize the viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
    }

    /// Visible world extent (width, height)
    pub fn view_size(&self) -> Vec2 {
        let height = self.config.view_height;
        Vec2::new(height * self.viewport().aspect_ratio(), height)
    }

    /// Camera settings
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn projection(&self) -> Mat4 {
        let half = self.view_size() * 0.5;
        Mat4::orthographic_off_center(-half.x, half.x, half.y, -half.y, self.config.near, self.config.far)
    }

    fn view(&self) -> Mat4 {
        self.world.try_inverse().unwrap_or_else(|| {
            log::warn!("Camera world transform is singular, using identity view");
            Mat4::identity()
        })
    }
}

impl Camera for OrthographicCamera {
    fn matrices(&self) -> (Mat4, Mat4) {
        (self.projection(), self.view())
    }

    fn screen_size(&self) -> Vec2 {
        Vec2::new(self.config.viewport_width as f32, self.config.viewport_height as f32)
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.config.viewport_width as f32, self.config.viewport_height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> OrthographicCamera {
        OrthographicCamera::new(CameraConfig {
            viewport_width: 200,
            viewport_height: 100,
            ..Default::default()
        })
    }

    #[test]
    fn test_view_width_follows_aspect_ratio() {
        let size = camera().view_size();
        assert_relative_eq!(size.x, 200.0);
        assert_relative_eq!(size.y, 100.0);
    }

    #[test]
    fn test_unproject_screen_center_is_camera_position() {
        let mut camera = camera();
        camera.look_at(Vec2::new(10.0, 20.0));

        let world = camera.unproject(Vec2::new(100.0, 50.0));

        assert_relative_eq!(world.x, 10.0, epsilon = 1e-4);
        assert_relative_eq!(world.y, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_unproject_top_left_corner() {
        let world = camera().unproject(Vec2::new(0.0, 0.0));

        // Y grows downwards, so the top of the screen is negative world Y.
        assert_relative_eq!(world.x, -100.0, epsilon = 1e-3);
        assert_relative_eq!(world.y, -50.0, epsilon = 1e-3);
    }
}
