//! Quad geometry collected from quadtree leaves

use crate::render::ColorVertex;
use crate::spatial::QuadTreeNode;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Vertex and index arrays with one quad (two triangles) per leaf
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadGeometry {
    /// Four vertices per quad, counter-clockwise from the minimum corner
    pub vertices: Vec<ColorVertex>,
    /// Six indices per quad
    pub indices: Vec<u32>,
}

impl QuadGeometry {
    /// Collect every leaf of `root` whose state equals `enabled`
    ///
    /// Leaves are visited depth first in quadrant order, so the output is
    /// stable for a given tree.
    pub fn collect(root: &QuadTreeNode, enabled: bool) -> Self {
        let mut geometry = Self::default();
        root.for_each_leaf(&mut |leaf| {
            if leaf.enabled != enabled {
                return;
            }

            let base = geometry.vertices.len() as u32;
            for corner in leaf.bounds.corners() {
                geometry.vertices.push(ColorVertex::new([corner.x, corner.y, 0.0], WHITE));
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 3, base, base + 2]);
        });
        geometry
    }

    /// Number of quads
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Check if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
