//! Region quadtree for destructible terrain
//!
//! Every node covers an axis-aligned square. Leaves carry an authoritative
//! enabled/disabled flag and, when enabled, one physics fixture. A split node
//! has exactly four children and no state of its own; it is "mixed" until an
//! edit leaves all four children as equal leaves, at which point it collapses
//! back into a single leaf.
//!
//! Node bounds are stored relative to the owning block. Brush tests add the
//! block's current world offset on every call.

use super::bounds::{Aabb2, Containment};
use super::brush::TerrainBrush;
use crate::foundation::math::Vec2;
use crate::physics::FixtureHandle;

/// Receives fixture lifecycle requests from quadtree edits
///
/// Bounds are given in block space, the same space the tree is built in.
pub trait FixtureSink {
    /// Create a fixture covering `bounds`
    fn create_fixture(&mut self, bounds: &Aabb2) -> Option<FixtureHandle>;

    /// Release a fixture created earlier
    fn destroy_fixture(&mut self, fixture: FixtureHandle);
}

/// A sink for trees without physics
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFixtures;

impl FixtureSink for NoFixtures {
    fn create_fixture(&mut self, _bounds: &Aabb2) -> Option<FixtureHandle> {
        None
    }

    fn destroy_fixture(&mut self, _fixture: FixtureHandle) {}
}

/// State of a quadtree node
#[derive(Debug)]
pub enum NodeState {
    /// Undivided region with an authoritative state
    Leaf {
        /// Solid (true) or carved away (false)
        enabled: bool,
        /// Physics fixture, present only while enabled and a sink provided one
        fixture: Option<FixtureHandle>,
    },
    /// Region divided into (min,min), (max-x,min-y), (min-x,max-y), (max,max)
    Split(Box<[QuadTreeNode; 4]>),
}

/// A leaf visited by [`QuadTreeNode::for_each_leaf`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafInfo {
    /// Leaf bounds in block space
    pub bounds: Aabb2,
    /// Depth below the root
    pub depth: u32,
    /// Leaf state
    pub enabled: bool,
}

/// One node of a region quadtree
#[derive(Debug)]
pub struct QuadTreeNode {
    bounds: Aabb2,
    depth: u32,
    max_depth: u32,
    state: NodeState,
}

impl QuadTreeNode {
    /// Create a root leaf
    ///
    /// No fixture is created here; call [`QuadTreeNode::sync_fixtures`] once a
    /// physics body exists.
    pub fn new(bounds: Aabb2, max_depth: u32, enabled: bool) -> Self {
        Self {
            bounds,
            depth: 0,
            max_depth,
            state: NodeState::Leaf { enabled, fixture: None },
        }
    }

    /// Bounds in block space
    pub fn bounds(&self) -> Aabb2 {
        self.bounds
    }

    /// Depth below the root
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Deepest level this tree may split to
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Node state
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Check if this node has no children
    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Leaf { .. })
    }

    /// Leaf state, `None` for a split node
    pub fn enabled(&self) -> Option<bool> {
        match self.state {
            NodeState::Leaf { enabled, .. } => Some(enabled),
            NodeState::Split(_) => None,
        }
    }

    /// Children of a split node
    pub fn children(&self) -> Option<&[QuadTreeNode; 4]> {
        match &self.state {
            NodeState::Split(children) => Some(children),
            NodeState::Leaf { .. } => None,
        }
    }

    /// Enable or disable the part of this node covered by `brush`
    ///
    /// `offset` is the world position of the block this tree belongs to.
    /// Returns true if any leaf changed state.
    pub fn set_region(
        &mut self,
        brush: &dyn TerrainBrush,
        offset: Vec2,
        target: bool,
        sink: &mut dyn FixtureSink,
    ) -> bool {
        if self.enabled() == Some(target) {
            return false;
        }

        match brush.containment(&self.bounds.translated(offset)) {
            Containment::Disjoint => false,
            Containment::Contains => {
                self.become_leaf(target, sink);
                true
            }
            Containment::Intersects if self.depth >= self.max_depth => {
                self.become_leaf(target, sink);
                true
            }
            Containment::Intersects => {
                self.split(sink);

                let mut changed = false;
                if let NodeState::Split(children) = &mut self.state {
                    for child in children.iter_mut() {
                        changed |= child.set_region(brush, offset, target, sink);
                    }
                }

                if let Some(enabled) = self.uniform_children() {
                    log::trace!("Collapsing quad at depth {} into {}", self.depth, if enabled { "solid" } else { "empty" });
                    self.become_leaf(enabled, sink);
                }
                changed
            }
        }
    }

    /// Make sure every enabled leaf owns a fixture and no other leaf does
    pub fn sync_fixtures(&mut self, sink: &mut dyn FixtureSink) {
        let bounds = self.bounds;
        match &mut self.state {
            NodeState::Leaf { enabled: true, fixture } => {
                if fixture.is_none() {
                    *fixture = sink.create_fixture(&bounds);
                }
            }
            NodeState::Leaf { enabled: false, fixture } => {
                if let Some(handle) = fixture.take() {
                    sink.destroy_fixture(handle);
                }
            }
            NodeState::Split(children) => {
                for child in children.iter_mut() {
                    child.sync_fixtures(sink);
                }
            }
        }
    }

    /// Release every fixture in this subtree
    pub fn release_fixtures(&mut self, sink: &mut dyn FixtureSink) {
        match &mut self.state {
            NodeState::Leaf { fixture, .. } => {
                if let Some(handle) = fixture.take() {
                    sink.destroy_fixture(handle);
                }
            }
            NodeState::Split(children) => {
                for child in children.iter_mut() {
                    child.release_fixtures(sink);
                }
            }
        }
    }

    /// Visit every leaf depth first, children in quadrant order
    pub fn for_each_leaf(&self, visit: &mut impl FnMut(LeafInfo)) {
        match &self.state {
            NodeState::Leaf { enabled, .. } => visit(LeafInfo {
                bounds: self.bounds,
                depth: self.depth,
                enabled: *enabled,
            }),
            NodeState::Split(children) => {
                for child in children.iter() {
                    child.for_each_leaf(visit);
                }
            }
        }
    }

    /// All leaves in traversal order
    pub fn leaves(&self) -> Vec<LeafInfo> {
        let mut leaves = Vec::new();
        self.for_each_leaf(&mut |leaf| leaves.push(leaf));
        leaves
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        match &self.state {
            NodeState::Leaf { .. } => 1,
            NodeState::Split(children) => children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Number of leaves in the given state
    pub fn leaf_count_with(&self, enabled: bool) -> usize {
        let mut count = 0;
        self.for_each_leaf(&mut |leaf| {
            if leaf.enabled == enabled {
                count += 1;
            }
        });
        count
    }

    /// Number of nodes, split or not
    pub fn node_count(&self) -> usize {
        match &self.state {
            NodeState::Leaf { .. } => 1,
            NodeState::Split(children) => 1 + children.iter().map(Self::node_count).sum::<usize>(),
        }
    }

    /// Number of fixtures held by leaves
    pub fn fixture_count(&self) -> usize {
        match &self.state {
            NodeState::Leaf { fixture, .. } => usize::from(fixture.is_some()),
            NodeState::Split(children) => children.iter().map(Self::fixture_count).sum(),
        }
    }

    /// Deepest leaf depth
    pub fn deepest_leaf(&self) -> u32 {
        match &self.state {
            NodeState::Leaf { .. } => self.depth,
            NodeState::Split(children) => children.iter().map(Self::deepest_leaf).max().unwrap_or(self.depth),
        }
    }

    /// State of the leaf containing a block-space point, `None` outside the tree
    pub fn is_enabled_at(&self, point: Vec2) -> Option<bool> {
        if !self.bounds.contains_point(point) {
            return None;
        }
        match &self.state {
            NodeState::Leaf { enabled, .. } => Some(*enabled),
            NodeState::Split(children) => children.iter().find_map(|child| child.is_enabled_at(point)),
        }
    }

    fn split(&mut self, sink: &mut dyn FixtureSink) {
        let NodeState::Leaf { enabled, fixture } = &mut self.state else {
            return;
        };
        let enabled = *enabled;
        if let Some(handle) = fixture.take() {
            sink.destroy_fixture(handle);
        }

        let depth = self.depth + 1;
        let max_depth = self.max_depth;
        let children = self.bounds.quadrants().map(|bounds| QuadTreeNode {
            bounds,
            depth,
            max_depth,
            state: NodeState::Leaf {
                enabled,
                fixture: if enabled { sink.create_fixture(&bounds) } else { None },
            },
        });
        self.state = NodeState::Split(Box::new(children));
    }

    fn become_leaf(&mut self, enabled: bool, sink: &mut dyn FixtureSink) {
        if self.enabled() == Some(enabled) {
            return;
        }
        self.release_fixtures(sink);

        let fixture = if enabled { sink.create_fixture(&self.bounds) } else { None };
        self.state = NodeState::Leaf { enabled, fixture };
    }

    fn uniform_children(&self) -> Option<bool> {
        let NodeState::Split(children) = &self.state else {
            return None;
        };
        let first = children[0].enabled()?;
        children
            .iter()
            .all(|child| child.enabled() == Some(first))
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{CircleBrush, RectangleBrush};
    use slotmap::SlotMap;

    /// Tracks live fixtures like a physics body would
    #[derive(Default)]
    struct RecordingSink {
        live: SlotMap<FixtureHandle, Aabb2>,
        created: usize,
    }

    impl FixtureSink for RecordingSink {
        fn create_fixture(&mut self, bounds: &Aabb2) -> Option<FixtureHandle> {
            self.created += 1;
            Some(self.live.insert(*bounds))
        }

        fn destroy_fixture(&mut self, fixture: FixtureHandle) {
            assert!(self.live.remove(fixture).is_some(), "fixture destroyed twice");
        }
    }

    fn block(size: f32, max_depth: u32) -> QuadTreeNode {
        QuadTreeNode::new(Aabb2::new(Vec2::zeros(), Vec2::new(size, size)), max_depth, true)
    }

    #[test]
    fn test_repeated_edit_reports_no_change() {
        let mut tree = block(128.0, 3);
        let brush = CircleBrush::at(Vec2::new(64.0, 64.0), 20.0);

        assert!(tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));
        assert!(!tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));

        assert!(tree.set_region(&brush, Vec2::zeros(), true, &mut NoFixtures));
        assert!(!tree.set_region(&brush, Vec2::zeros(), true, &mut NoFixtures));
    }

    #[test]
    fn test_split_then_merge_restores_single_leaf() {
        let mut tree = block(128.0, 3);
        let brush = RectangleBrush::covering(Aabb2::new(Vec2::new(16.0, 16.0), Vec2::new(32.0, 32.0)));

        assert!(tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));
        assert_eq!(tree.deepest_leaf(), 3);
        assert_eq!(tree.leaf_count(), 10);
        assert_eq!(tree.leaf_count_with(false), 1);
        assert_eq!(tree.is_enabled_at(Vec2::new(20.0, 20.0)), Some(false));

        assert!(tree.set_region(&brush, Vec2::zeros(), true, &mut NoFixtures));
        assert!(tree.is_leaf());
        assert_eq!(tree.enabled(), Some(true));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_touching_brush_changes_nothing() {
        let mut tree = block(64.0, 4);
        let brush = RectangleBrush::covering(Aabb2::new(Vec2::new(64.0, 0.0), Vec2::new(80.0, 64.0)));

        assert!(!tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));
        assert!(tree.is_leaf());
    }

    #[test]
    fn test_brush_covering_block_skips_splitting() {
        let mut tree = block(64.0, 4);
        let brush = CircleBrush::at(Vec2::new(32.0, 32.0), 100.0);

        assert!(tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));
        assert!(tree.is_leaf());
        assert_eq!(tree.enabled(), Some(false));
    }

    #[test]
    fn test_max_depth_zero_treats_intersection_as_containment() {
        let mut tree = block(64.0, 0);
        let brush = CircleBrush::at(Vec2::new(0.0, 0.0), 5.0);

        assert!(tree.set_region(&brush, Vec2::zeros(), false, &mut NoFixtures));
        assert!(tree.is_leaf());
        assert_eq!(tree.enabled(), Some(false));
    }

    #[test]
    fn test_offset_moves_tree_into_world() {
        let mut tree = block(64.0, 2);
        let brush = CircleBrush::at(Vec2::new(10.0, 10.0), 4.0);

        assert!(!tree.set_region(&brush, Vec2::new(128.0, 0.0), false, &mut NoFixtures));
        assert!(tree.set_region(&brush, Vec2::new(0.0, 0.0), false, &mut NoFixtures));
    }

    #[test]
    fn test_fixtures_follow_enabled_leaves() {
        let mut sink = RecordingSink::default();
        let mut tree = block(128.0, 4);
        tree.sync_fixtures(&mut sink);
        assert_eq!(sink.live.len(), 1);

        let brushes = [
            (CircleBrush::at(Vec2::new(30.0, 30.0), 25.0), false),
            (CircleBrush::at(Vec2::new(100.0, 90.0), 12.0), false),
            (CircleBrush::at(Vec2::new(40.0, 40.0), 10.0), true),
        ];
        for (brush, target) in &brushes {
            tree.set_region(brush, Vec2::zeros(), *target, &mut sink);
            assert_eq!(sink.live.len(), tree.leaf_count_with(true));
            assert_eq!(tree.fixture_count(), sink.live.len());
        }

        tree.release_fixtures(&mut sink);
        assert!(sink.live.is_empty());
        assert!(sink.created > 1);
    }

    #[test]
    fn test_leaves_tile_the_block() {
        let mut tree = block(128.0, 5);
        tree.set_region(&CircleBrush::at(Vec2::new(50.0, 70.0), 33.0), Vec2::zeros(), false, &mut NoFixtures);

        let area: f32 = tree
            .leaves()
            .iter()
            .map(|leaf| leaf.bounds.size().x * leaf.bounds.size().y)
            .sum();
        assert!((area - 128.0 * 128.0).abs() < 1e-2);
        assert_eq!(tree.leaves().len(), tree.leaf_count());
    }
}
