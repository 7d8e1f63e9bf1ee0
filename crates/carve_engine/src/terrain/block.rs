//! One square block of terrain

use log::{debug, trace, warn};

use super::{QuadGeometry, TerrainError};
use crate::foundation::math::{Vec2, Vec4};
use crate::physics::{BodyHandle, BodyKind, CollisionCategory, FixtureHandle, PhysicsWorld};
use crate::render::{BufferHandle, RenderError, Renderer};
use crate::scene::{NodeId, SceneGraph};
use crate::spatial::{Aabb2, FixtureSink, NoFixtures, QuadTreeNode, TerrainBrush};

/// Creates one static rectangle per enabled leaf on a block's body
struct BodyFixtures<'a> {
    physics: &'a mut dyn PhysicsWorld,
    body: BodyHandle,
}

impl FixtureSink for BodyFixtures<'_> {
    fn create_fixture(&mut self, bounds: &Aabb2) -> Option<FixtureHandle> {
        let size = bounds.size();
        match self
            .physics
            .attach_rectangle_fixture(self.body, size.x, size.y, bounds.center(), CollisionCategory::TERRAIN)
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("Failed to attach terrain fixture: {}", err);
                None
            }
        }
    }

    fn destroy_fixture(&mut self, fixture: FixtureHandle) {
        if let Err(err) = self.physics.destroy_fixture(fixture) {
            warn!("Failed to destroy terrain fixture: {}", err);
        }
    }
}

/// GPU copy of one geometry cache
#[derive(Debug, Default)]
struct GpuQuads {
    buffer: Option<BufferHandle>,
    stale: bool,
}

impl GpuQuads {
    fn sync(&mut self, geometry: &QuadGeometry, renderer: &mut dyn Renderer) -> Result<Option<BufferHandle>, RenderError> {
        if self.stale {
            if let Some(old) = self.buffer.take() {
                renderer.release(old)?;
            }
            if !geometry.is_empty() {
                self.buffer = Some(renderer.upload(&geometry.vertices, &geometry.indices)?);
            }
            self.stale = false;
        }
        Ok(self.buffer)
    }
}

/// A quadtree covering one block, bound to a scene node and a static body
///
/// Leaf bounds are local to the block: the root spans `(0, 0)` to
/// `(block_size, block_size)` and the scene node supplies the placement.
#[derive(Debug)]
pub struct QuadTree {
    name: String,
    root: QuadTreeNode,
    node: NodeId,
    body: Option<BodyHandle>,
    enabled_quads: QuadGeometry,
    disabled_quads: QuadGeometry,
    enabled_gpu: GpuQuads,
    disabled_gpu: GpuQuads,
    dirty: bool,
}

impl QuadTree {
    /// Create a fully solid block driven by `node`
    pub fn new(name: impl Into<String>, block_size: f32, max_depth: u32, node: NodeId) -> Self {
        let root = QuadTreeNode::new(Aabb2::new(Vec2::zeros(), Vec2::new(block_size, block_size)), max_depth, true);
        Self {
            name: name.into(),
            root,
            node,
            body: None,
            enabled_quads: QuadGeometry::default(),
            disabled_quads: QuadGeometry::default(),
            enabled_gpu: GpuQuads::default(),
            disabled_gpu: GpuQuads::default(),
            dirty: true,
        }
    }

    /// Block name, `<terrain>_x<col>y<row>`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scene node that places this block
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Static body holding the block's fixtures
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Root of the block's quadtree
    pub fn root(&self) -> &QuadTreeNode {
        &self.root
    }

    /// Check if geometry is waiting for [`refresh`](Self::refresh)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached quads for enabled leaves
    pub fn enabled_quads(&self) -> &QuadGeometry {
        &self.enabled_quads
    }

    /// Cached quads for disabled leaves
    pub fn disabled_quads(&self) -> &QuadGeometry {
        &self.disabled_quads
    }

    /// World-space bounds of the block
    pub fn world_bounds(&self, scene: &SceneGraph) -> Result<Aabb2, TerrainError> {
        Ok(self.root.bounds().translated(self.offset(scene)?))
    }

    fn offset(&self, scene: &SceneGraph) -> Result<Vec2, TerrainError> {
        Ok(scene.position(self.node)?.xy())
    }

    /// Create the static body and one fixture per enabled leaf
    pub fn attach_physics(&mut self, scene: &SceneGraph, physics: &mut dyn PhysicsWorld) -> Result<(), TerrainError> {
        if self.body.is_some() {
            return Ok(());
        }

        let body = physics.create_body(BodyKind::Static, self.offset(scene)?);
        self.body = Some(body);
        self.root.sync_fixtures(&mut BodyFixtures { physics: &mut *physics, body });
        trace!("{}: {} fixtures attached", self.name, self.root.fixture_count());
        Ok(())
    }

    /// Destroy the body and forget every fixture handle
    pub fn detach_physics(&mut self, physics: &mut dyn PhysicsWorld) -> Result<(), TerrainError> {
        if let Some(body) = self.body.take() {
            self.root.release_fixtures(&mut BodyFixtures { physics: &mut *physics, body });
            physics.dispose_body(body)?;
        }
        Ok(())
    }

    /// Set every leaf the brush reaches to `state`
    ///
    /// Fixtures follow the leaves immediately. Geometry is only marked dirty;
    /// call [`refresh`](Self::refresh) to rebuild it. Returns true if anything
    /// changed.
    pub fn set_quads(
        &mut self,
        scene: &SceneGraph,
        physics: &mut dyn PhysicsWorld,
        brush: &dyn TerrainBrush,
        state: bool,
    ) -> Result<bool, TerrainError> {
        let offset = self.offset(scene)?;
        let changed = match self.body {
            Some(body) => self.root.set_region(brush, offset, state, &mut BodyFixtures { physics: &mut *physics, body }),
            None => self.root.set_region(brush, offset, state, &mut NoFixtures),
        };

        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Rebuild both geometry caches if the tree changed since the last refresh
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }

        self.enabled_quads = QuadGeometry::collect(&self.root, true);
        self.disabled_quads = QuadGeometry::collect(&self.root, false);
        self.enabled_gpu.stale = true;
        self.disabled_gpu.stale = true;
        self.dirty = false;
        debug!(
            "{}: rebuilt geometry ({} solid, {} empty quads)",
            self.name,
            self.enabled_quads.quad_count(),
            self.disabled_quads.quad_count()
        );
    }

    /// Draw the enabled or disabled quads with a flat color
    ///
    /// Buffers are uploaded here on first use after a refresh.
    pub fn draw(
        &mut self,
        scene: &SceneGraph,
        renderer: &mut dyn Renderer,
        enabled: bool,
        color: Vec4,
    ) -> Result<(), TerrainError> {
        let buffer = if enabled {
            self.enabled_gpu.sync(&self.enabled_quads, renderer)?
        } else {
            self.disabled_gpu.sync(&self.disabled_quads, renderer)?
        };

        if let Some(buffer) = buffer {
            renderer.draw_indexed(buffer, &scene.transformation(self.node)?, color)?;
        }
        Ok(())
    }

    /// Hand back the GPU buffers so they can be released
    pub(crate) fn take_buffers(&mut self) -> Vec<BufferHandle> {
        self.enabled_gpu.stale = true;
        self.disabled_gpu.stale = true;
        [self.enabled_gpu.buffer.take(), self.disabled_gpu.buffer.take()]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::physics::BasicPhysicsWorld;
    use crate::render::HeadlessRenderer;
    use crate::spatial::CircleBrush;

    fn block_at(scene: &mut SceneGraph, position: Vec3) -> QuadTree {
        let node = scene.create_child(scene.root(), Some("block")).unwrap();
        scene.set_local_position(node, position).unwrap();
        QuadTree::new("block", 32.0, 4, node)
    }

    #[test]
    fn test_fixtures_follow_enabled_leaves() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut block = block_at(&mut scene, Vec3::new(64.0, 0.0, 0.0));
        block.attach_physics(&scene, &mut physics).unwrap();
        let body = block.body().unwrap();
        assert_eq!(physics.fixture_count(body), 1);

        let changed = block
            .set_quads(&scene, &mut physics, &CircleBrush::at(Vec2::new(80.0, 16.0), 6.0), false)
            .unwrap();

        assert!(changed);
        assert!(block.is_dirty());
        assert_eq!(physics.fixture_count(body), block.root().leaf_count_with(true));
    }

    #[test]
    fn test_brush_uses_world_position() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut block = block_at(&mut scene, Vec3::new(64.0, 0.0, 0.0));

        // Local coordinates would hit, world coordinates do not
        let changed = block
            .set_quads(&scene, &mut physics, &CircleBrush::at(Vec2::new(16.0, 16.0), 6.0), false)
            .unwrap();

        assert!(!changed);
        assert_eq!(block.root().leaf_count(), 1);
    }

    #[test]
    fn test_refresh_rebuilds_and_uploads_lazily() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut renderer = HeadlessRenderer::new();
        let mut block = block_at(&mut scene, Vec3::zeros());
        block.refresh();
        assert!(!block.is_dirty());
        assert_eq!(renderer.upload_count(), 0);

        block.draw(&scene, &mut renderer, true, Vec4::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        block.draw(&scene, &mut renderer, true, Vec4::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(renderer.upload_count(), 1);
        assert_eq!(renderer.draw_calls().len(), 2);

        block
            .set_quads(&scene, &mut physics, &CircleBrush::at(Vec2::new(0.0, 0.0), 10.0), false)
            .unwrap();
        block.refresh();
        block.draw(&scene, &mut renderer, true, Vec4::new(0.0, 0.0, 1.0, 1.0)).unwrap();

        assert_eq!(renderer.upload_count(), 2);
        assert_eq!(renderer.live_buffers(), 1);
        assert_eq!(
            block.enabled_quads().quad_count() + block.disabled_quads().quad_count(),
            block.root().leaf_count()
        );
    }

    #[test]
    fn test_detach_physics_disposes_body() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut block = block_at(&mut scene, Vec3::zeros());
        block.attach_physics(&scene, &mut physics).unwrap();

        block.detach_physics(&mut physics).unwrap();

        assert!(block.body().is_none());
        assert_eq!(block.root().fixture_count(), 0);
        assert_eq!(physics.body_count(), 0);
    }
}
