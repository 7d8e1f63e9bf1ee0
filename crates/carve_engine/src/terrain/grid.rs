//! Grid of quadtree blocks

use std::any::Any;

use log::{debug, info, trace, warn};

use super::{QuadTree, TerrainError};
use crate::config::TerrainConfig;
use crate::entity::{Entity, EntityError, WorldContext};
use crate::foundation::math::{Vec2, Vec3, Vec4};
use crate::render::{BufferHandle, Renderer};
use crate::scene::{NodeId, SceneGraph};
use crate::spatial::TerrainBrush;

/// Flat color for solid quads in debug draws
const SOLID_COLOR: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);
/// Flat color for carved-out quads in debug draws
const EMPTY_COLOR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

/// Aggregate counts over every block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainStats {
    /// Number of blocks
    pub blocks: usize,
    /// Quadtree nodes, inner and leaf
    pub nodes: usize,
    /// Enabled leaves
    pub solid_leaves: usize,
    /// Disabled leaves
    pub empty_leaves: usize,
    /// Fixture handles held by leaves
    pub fixtures: usize,
    /// Depth of the deepest leaf
    pub deepest: u32,
}

impl TerrainStats {
    /// Total leaves
    pub fn leaves(&self) -> usize {
        self.solid_leaves + self.empty_leaves
    }
}

/// Destructible terrain made of equally sized square blocks
///
/// Blocks are stored row-major. Block `(x, y)` sits at
/// `origin + (x * block_size, y * block_size)` under the terrain's node.
#[derive(Debug)]
pub struct Terrain {
    name: String,
    config: TerrainConfig,
    columns: usize,
    rows: usize,
    node: Option<NodeId>,
    blocks: Vec<QuadTree>,
    debug_draw: bool,
    retired: Vec<BufferHandle>,
}

impl Terrain {
    /// Create an unloaded terrain after validating the configuration
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        config.validate()?;
        let (columns, rows) = config.grid_dimensions();
        Ok(Self {
            name: String::from("Terrain"),
            config,
            columns,
            rows,
            node: None,
            blocks: Vec::new(),
            debug_draw: false,
            retired: Vec::new(),
        })
    }

    /// Builder method to set the name used for the terrain and block nodes
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Terrain configuration
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Blocks along (x, y)
    pub fn grid_size(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    /// Check if blocks exist
    pub fn is_loaded(&self) -> bool {
        self.node.is_some()
    }

    /// Scene node all blocks hang from
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Block at grid coordinates
    pub fn block(&self, x: usize, y: usize) -> Option<&QuadTree> {
        if x >= self.columns || y >= self.rows {
            return None;
        }
        self.blocks.get(y * self.columns + x)
    }

    /// All blocks, row-major
    pub fn blocks(&self) -> &[QuadTree] {
        &self.blocks
    }

    /// Draw disabled quads as well as enabled ones
    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_draw = enabled;
    }

    /// Check if disabled quads are drawn
    pub fn debug_draw(&self) -> bool {
        self.debug_draw
    }

    /// Build the block grid under `parent`
    ///
    /// Every block starts fully solid with one fixture on its static body.
    pub fn load(&mut self, ctx: &mut WorldContext<'_>, parent: NodeId) -> Result<(), TerrainError> {
        if self.is_loaded() {
            return Err(TerrainError::AlreadyLoaded);
        }

        let node = ctx.scene.create_child(parent, Some(self.name.as_str()))?;
        let [ox, oy] = self.config.origin;
        ctx.scene.set_local_position(node, Vec3::new(ox, oy, 0.0))?;

        let block_size = self.config.block_size;
        let mut blocks = Vec::with_capacity(self.columns * self.rows);
        for y in 0..self.rows {
            for x in 0..self.columns {
                let name = format!("{}_x{}y{}", self.name, x, y);
                let cell = ctx.scene.create_child(node, Some(name.as_str()))?;
                ctx.scene
                    .set_local_position(cell, Vec3::new(x as f32 * block_size, y as f32 * block_size, 0.0))?;

                let mut block = QuadTree::new(name, block_size, self.config.max_depth, cell);
                block.attach_physics(ctx.scene, &mut *ctx.physics)?;
                block.refresh();
                blocks.push(block);
            }
        }

        self.node = Some(node);
        self.blocks = blocks;
        info!(
            "Loaded terrain '{}': {}x{} blocks of {} units",
            self.name, self.columns, self.rows, block_size
        );
        Ok(())
    }

    /// Tear down bodies and nodes
    ///
    /// GPU buffers are queued and freed by the next [`draw`](Self::draw) or
    /// [`release_buffers`](Self::release_buffers). A failing block does not
    /// stop the others from being torn down; the first error is returned.
    pub fn unload(&mut self, ctx: &mut WorldContext<'_>) -> Result<(), TerrainError> {
        let Some(node) = self.node.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for mut block in self.blocks.drain(..) {
            if let Err(err) = block.detach_physics(&mut *ctx.physics) {
                warn!("Failed to release physics of block '{}': {}", block.name(), err);
                first_error.get_or_insert(err);
            }
            self.retired.extend(block.take_buffers());
        }
        if let Err(err) = ctx.scene.destroy_node(node) {
            first_error.get_or_insert(err.into());
        }
        info!("Unloaded terrain '{}'", self.name);

        first_error.map_or(Ok(()), Err)
    }

    /// Set every quad the brush reaches to `state`
    ///
    /// Only blocks whose bounds overlap the brush bounds are visited. With
    /// `defer` the geometry of changed blocks stays dirty until
    /// [`refresh`](Self::refresh). Returns true if any block changed.
    pub fn set_quads(
        &mut self,
        ctx: &mut WorldContext<'_>,
        brush: &dyn TerrainBrush,
        state: bool,
        defer: bool,
    ) -> Result<bool, TerrainError> {
        if !self.is_loaded() {
            return Err(TerrainError::NotLoaded);
        }

        let reach = brush.bounds();
        let mut changed_blocks = 0;
        for block in &mut self.blocks {
            if !reach.overlaps(&block.world_bounds(ctx.scene)?) {
                continue;
            }

            if block.set_quads(ctx.scene, &mut *ctx.physics, brush, state)? {
                changed_blocks += 1;
                if !defer {
                    block.refresh();
                }
            }
        }

        trace!(
            "set_quads({}) at {:?} changed {} blocks",
            state,
            brush.position(),
            changed_blocks
        );
        Ok(changed_blocks > 0)
    }

    /// Rebuild geometry of every dirty block
    pub fn refresh(&mut self) {
        let dirty = self.blocks.iter().filter(|block| block.is_dirty()).count();
        for block in &mut self.blocks {
            block.refresh();
        }
        if dirty > 0 {
            debug!("Refreshed {} terrain blocks", dirty);
        }
    }

    /// Draw solid quads, plus carved quads when debug drawing is on
    pub fn draw(&mut self, scene: &SceneGraph, renderer: &mut dyn Renderer) -> Result<(), TerrainError> {
        self.release_buffers(renderer);

        for block in &mut self.blocks {
            block.draw(scene, renderer, true, SOLID_COLOR)?;
            if self.debug_draw {
                block.draw(scene, renderer, false, EMPTY_COLOR)?;
            }
        }
        Ok(())
    }

    /// Free buffers left behind by [`unload`](Self::unload)
    pub fn release_buffers(&mut self, renderer: &mut dyn Renderer) {
        for buffer in self.retired.drain(..) {
            if let Err(err) = renderer.release(buffer) {
                warn!("Failed to release terrain buffer: {}", err);
            }
        }
    }

    /// Solid state at a world point, `None` outside the terrain
    pub fn is_solid_at(&self, scene: &SceneGraph, point: Vec2) -> Result<Option<bool>, TerrainError> {
        for block in &self.blocks {
            let bounds = block.world_bounds(scene)?;
            if bounds.contains_point(point) {
                return Ok(block.root().is_enabled_at(point - bounds.min));
            }
        }
        Ok(None)
    }

    /// Counts over every block
    pub fn stats(&self) -> TerrainStats {
        self.blocks.iter().fold(
            TerrainStats {
                blocks: self.blocks.len(),
                ..TerrainStats::default()
            },
            |mut stats, block| {
                let root = block.root();
                stats.nodes += root.node_count();
                stats.solid_leaves += root.leaf_count_with(true);
                stats.empty_leaves += root.leaf_count_with(false);
                stats.fixtures += root.fixture_count();
                stats.deepest = stats.deepest.max(root.deepest_leaf());
                stats
            },
        )
    }
}

impl Entity for Terrain {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_content(&mut self, ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        let root = ctx.scene.root();
        Ok(self.load(ctx, root)?)
    }

    fn unload_content(&mut self, ctx: &mut WorldContext<'_>) -> Result<(), EntityError> {
        Ok(self.unload(ctx)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
