//! Terrain grid scenarios on a live scene graph and physics world

use crate::config::TerrainConfig;
use crate::entity::WorldContext;
use crate::foundation::math::{Vec2, Vec3};
use crate::physics::{BasicPhysicsWorld, CollisionCategory, PhysicsWorld};
use crate::render::HeadlessRenderer;
use crate::scene::SceneGraph;
use crate::spatial::{Aabb2, CircleBrush, RectangleBrush, TerrainBrush};
use crate::terrain::Terrain;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(columns: usize, rows: usize, block_size: f32, max_depth: u32) -> TerrainConfig {
        TerrainConfig {
            terrain_size: [columns as f32 * block_size, rows as f32 * block_size],
            block_size,
            max_depth,
            origin: [0.0, 0.0],
        }
    }

    fn assert_coherent(terrain: &Terrain, physics: &BasicPhysicsWorld) {
        for block in terrain.blocks() {
            let root = block.root();
            if !block.is_dirty() {
                assert_eq!(
                    block.enabled_quads().quad_count() + block.disabled_quads().quad_count(),
                    root.leaf_count(),
                    "{}",
                    block.name()
                );
            }
            assert_eq!(physics.fixture_count(block.body().unwrap()), root.leaf_count_with(true), "{}", block.name());
        }
    }

    #[test]
    fn test_circle_at_origin_splits_corner_block() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut ctx = WorldContext {
            scene: &mut scene,
            physics: &mut physics,
        };
        let mut terrain = Terrain::new(grid(2, 2, 128.0, 3)).unwrap();
        let root = ctx.scene.root();
        terrain.load(&mut ctx, root).unwrap();
        let before = terrain.block(0, 0).unwrap().root().leaf_count();
        assert_eq!(before, 1);

        let changed = terrain
            .set_quads(&mut ctx, &CircleBrush::at(Vec2::zeros(), 20.0), false, false)
            .unwrap();

        assert!(changed);
        let corner = terrain.block(0, 0).unwrap().root();
        assert!(corner.leaf_count() > before);
        assert_eq!(corner.deepest_leaf(), 3);
        for (x, y) in [(1, 0), (0, 1), (1, 1)] {
            assert_eq!(terrain.block(x, y).unwrap().root().leaf_count(), 1);
        }
        assert_coherent(&terrain, &physics);
    }

    #[test]
    fn test_repeated_brush_reports_no_change() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut ctx = WorldContext {
            scene: &mut scene,
            physics: &mut physics,
        };
        let mut terrain = Terrain::new(grid(2, 1, 64.0, 4)).unwrap();
        let root = ctx.scene.root();
        terrain.load(&mut ctx, root).unwrap();
        let brush = CircleBrush::at(Vec2::new(70.0, 20.0), 15.0);

        assert!(terrain.set_quads(&mut ctx, &brush, false, false).unwrap());
        assert!(!terrain.set_quads(&mut ctx, &brush, false, false).unwrap());
        assert!(terrain.set_quads(&mut ctx, &brush, true, false).unwrap());
        assert!(!terrain.set_quads(&mut ctx, &brush, true, false).unwrap());
        assert_eq!(terrain.stats().leaves(), 2);
    }

    #[test]
    fn test_single_leaf_round_trip_collapses() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut ctx = WorldContext {
            scene: &mut scene,
            physics: &mut physics,
        };
        let mut terrain = Terrain::new(grid(1, 1, 64.0, 3)).unwrap();
        let root = ctx.scene.root();
        terrain.load(&mut ctx, root).unwrap();

        // One leaf at depth 3 is 8 units wide
        let leaf = RectangleBrush::covering(Aabb2::new(Vec2::new(24.0, 32.0), Vec2::new(32.0, 40.0)));
        terrain.set_quads(&mut ctx, &leaf, false, false).unwrap();
        let stats = terrain.stats();
        assert_eq!(stats.empty_leaves, 1);
        assert_eq!(stats.deepest, 3);

        terrain.set_quads(&mut ctx, &leaf, true, false).unwrap();

        let block = terrain.block(0, 0).unwrap().root();
        assert!(block.is_leaf());
        assert_eq!(block.enabled(), Some(true));
        assert_coherent(&terrain, &physics);
    }

    #[test]
    fn test_random_strokes_stay_coherent() {
        let mut rng = StdRng::seed_from_u64(2013);
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut terrain = Terrain::new(grid(3, 2, 32.0, 4)).unwrap();
        {
            let mut ctx = WorldContext {
                scene: &mut scene,
                physics: &mut physics,
            };
            let root = ctx.scene.root();
            terrain.load(&mut ctx, root).unwrap();
        }

        for stroke in 0..60 {
            let center = Vec2::new(rng.gen_range(-8.0..104.0), rng.gen_range(-8.0..72.0));
            let state = rng.gen_bool(0.3);
            let defer = stroke % 3 == 0;
            let brush: Box<dyn TerrainBrush> = if rng.gen_bool(0.5) {
                Box::new(CircleBrush::at(center, rng.gen_range(1.0..12.0)))
            } else {
                Box::new(RectangleBrush::at(
                    center,
                    Vec2::new(rng.gen_range(1.0..16.0), rng.gen_range(1.0..16.0)),
                ))
            };

            let mut ctx = WorldContext {
                scene: &mut scene,
                physics: &mut physics,
            };
            terrain.set_quads(&mut ctx, brush.as_ref(), state, defer).unwrap();
            assert_coherent(&terrain, &physics);
        }

        terrain.refresh();
        assert!(terrain.blocks().iter().all(|block| !block.is_dirty()));
        assert_coherent(&terrain, &physics);
    }

    #[test]
    fn test_terrain_fixtures_answer_point_queries() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut ctx = WorldContext {
            scene: &mut scene,
            physics: &mut physics,
        };
        let mut terrain = Terrain::new(grid(2, 2, 32.0, 4)).unwrap();
        let root = ctx.scene.root();
        terrain.load(&mut ctx, root).unwrap();
        terrain
            .set_quads(&mut ctx, &CircleBrush::at(Vec2::new(32.0, 32.0), 6.0), false, false)
            .unwrap();

        assert!(!physics.query_point(Vec2::new(32.0, 32.0), CollisionCategory::TERRAIN));
        assert!(physics.query_point(Vec2::new(50.0, 50.0), CollisionCategory::TERRAIN));
        assert!(!physics.query_point(Vec2::new(50.0, 50.0), CollisionCategory::PLAYER));
        assert_eq!(terrain.is_solid_at(&scene, Vec2::new(32.0, 32.0)).unwrap(), Some(false));
    }

    #[test]
    fn test_offset_terrain_follows_its_node() {
        let mut scene = SceneGraph::new();
        let mut physics = BasicPhysicsWorld::new();
        let mut renderer = HeadlessRenderer::new();
        let mut config = grid(1, 1, 32.0, 3);
        config.origin = [100.0, 0.0];
        let mut terrain = Terrain::new(config).unwrap().with_name("Cave");
        {
            let mut ctx = WorldContext {
                scene: &mut scene,
                physics: &mut physics,
            };
            let root = ctx.scene.root();
            terrain.load(&mut ctx, root).unwrap();

            let missed = terrain
                .set_quads(&mut ctx, &CircleBrush::at(Vec2::new(16.0, 16.0), 4.0), false, false)
                .unwrap();
            assert!(!missed);
            let hit = terrain
                .set_quads(&mut ctx, &CircleBrush::at(Vec2::new(116.0, 16.0), 4.0), false, false)
                .unwrap();
            assert!(hit);
        }

        terrain.draw(&scene, &mut renderer).unwrap();
        let call = &renderer.draw_calls()[0];
        assert_eq!(call.transform.column(3).xyz(), Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(terrain.block(0, 0).unwrap().name(), "Cave_x0y0");
    }
}
