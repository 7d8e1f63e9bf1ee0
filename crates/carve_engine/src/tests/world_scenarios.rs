//! Entity world scenarios: terrain as an entity, controllers carving it,
//! camera picking and teardown

use std::any::Any;

use crate::config::{CameraConfig, TerrainConfig};
use crate::entity::{Entity, EntityController, EntityWorld, WorldCommands, WorldContext};
use crate::foundation::math::Vec2;
use crate::foundation::time::GameTime;
use crate::render::{Camera, HeadlessRenderer, OrthographicCamera};
use crate::spatial::{CircleBrush, TerrainBrush};
use crate::terrain::Terrain;
use approx::assert_relative_eq;

/// Carves a small hole every update, moving right each time
struct Burrower {
    brush: CircleBrush,
    step: f32,
    carved: usize,
}

impl EntityController for Burrower {
    fn update(
        &mut self,
        entity: &mut dyn Entity,
        ctx: &mut WorldContext<'_>,
        _commands: &mut WorldCommands,
        _time: &GameTime,
    ) {
        let Some(terrain) = entity.as_any_mut().downcast_mut::<Terrain>() else {
            return;
        };
        if let Ok(true) = terrain.set_quads(ctx, &self.brush, false, false) {
            self.carved += 1;
        }
        let next = self.brush.position() + Vec2::new(self.step, 0.0);
        self.brush.set_position(next);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain_config() -> TerrainConfig {
        TerrainConfig {
            terrain_size: [128.0, 64.0],
            block_size: 64.0,
            max_depth: 4,
            origin: [0.0, 0.0],
        }
    }

    #[test]
    fn test_terrain_entity_lifecycle() {
        let mut world = EntityWorld::default();
        let nodes_before = world.scene().node_count();

        let id = world.add(Box::new(Terrain::new(terrain_config()).unwrap())).unwrap();
        assert_eq!(world.scene().node_count(), nodes_before + 3);
        assert_eq!(world.find_by_name("Terrain"), Some(id));

        let changed = world
            .with_entity::<Terrain, _>(id, |terrain, ctx| {
                terrain.set_quads(ctx, &CircleBrush::at(Vec2::new(64.0, 32.0), 10.0), false, false)
            })
            .unwrap()
            .unwrap();
        assert!(changed);

        world.remove(id).unwrap();
        assert_eq!(world.scene().node_count(), nodes_before);
        assert!(world.is_empty());
    }

    #[test]
    fn test_controller_carves_each_update() {
        let mut world = EntityWorld::default();
        let camera = OrthographicCamera::new(CameraConfig::default());
        let id = world.add(Box::new(Terrain::new(terrain_config()).unwrap())).unwrap();
        let controller = world
            .attach_controller(
                id,
                Box::new(Burrower {
                    brush: CircleBrush::at(Vec2::new(8.0, 32.0), 5.0),
                    step: 12.0,
                    carved: 0,
                }),
            )
            .unwrap();

        let mut time = GameTime::new(0.0, 1.0 / 60.0);
        for _ in 0..10 {
            world.update(&time, &camera);
            time = time.advanced(1.0 / 60.0);
        }

        assert_eq!(world.controller::<Burrower>(controller).unwrap().carved, 10);
        let terrain = world.entity::<Terrain>(id).unwrap();
        for x in [8.0, 56.0, 104.0] {
            assert_eq!(
                terrain.is_solid_at(world.scene(), Vec2::new(x, 32.0)).unwrap(),
                Some(false)
            );
        }
        assert_eq!(terrain.is_solid_at(world.scene(), Vec2::new(8.0, 4.0)).unwrap(), Some(true));
        let stats = terrain.stats();
        assert_eq!(stats.fixtures, stats.solid_leaves);
    }

    #[test]
    fn test_camera_picks_brush_position() {
        let mut world = EntityWorld::default();
        let mut renderer = HeadlessRenderer::new();
        let mut camera = OrthographicCamera::new(CameraConfig::default());
        camera.look_at(Vec2::new(64.0, 32.0));
        let id = world.add(Box::new(Terrain::new(terrain_config()).unwrap())).unwrap();

        let size = camera.screen_size();
        let picked = camera.unproject(size * 0.5);
        assert_relative_eq!(picked, Vec2::new(64.0, 32.0), epsilon = 1e-3);

        world
            .with_entity::<Terrain, _>(id, |terrain, ctx| {
                terrain.set_quads(ctx, &CircleBrush::at(picked, 8.0), false, false)
            })
            .unwrap()
            .unwrap();
        world.update(&GameTime::new(0.0, 1.0 / 60.0), &camera);

        let terrain = world.entity::<Terrain>(id).unwrap();
        assert_eq!(terrain.is_solid_at(world.scene(), picked).unwrap(), Some(false));

        world.entity_mut::<Terrain>(id).unwrap().set_debug_draw(true);
        world
            .with_entity::<Terrain, _>(id, |terrain, ctx| terrain.draw(ctx.scene, &mut renderer))
            .unwrap()
            .unwrap();

        // Both blocks are cut, so each draws its solid and its carved quads
        assert_eq!(renderer.draw_calls().len(), 4);
    }

    #[test]
    fn test_with_entity_rejects_wrong_type() {
        let mut world = EntityWorld::default();
        let id = world.add(Box::new(Terrain::new(terrain_config()).unwrap())).unwrap();

        let result = world.with_entity::<crate::entity::PhysicalEntity, _>(id, |_, _| ());

        assert!(result.is_err());
        assert!(world.entity::<Terrain>(id).is_some());
    }
}
