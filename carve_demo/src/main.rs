//! Headless terrain carving demo
//!
//! Builds a world with a quadtree terrain, carves procedural tunnels with
//! deferred geometry rebuilds, then paints along a cursor path unprojected
//! through the camera while a dropped body falls through the level. Pass a
//! `.toml` or `.ron` config path as the first argument to override defaults.

mod config;
mod cursor;
mod tunnels;

use carve_engine::config::{Config, ConfigError};
use carve_engine::entity::{EntityError, EntityWorld, PhysicalEntity};
use carve_engine::foundation::delayed::{DelayedError, DelayedResult};
use carve_engine::foundation::logging;
use carve_engine::foundation::math::{Vec2, Vec3};
use carve_engine::foundation::time::GameTime;
use carve_engine::physics::{BasicPhysicsWorld, BodyKind, CollisionCategory};
use carve_engine::render::{Camera, HeadlessRenderer, OrthographicCamera, RenderError, Renderer};
use carve_engine::scene::{layer, Capabilities, Layer, SceneError};
use carve_engine::spatial::CircleBrush;
use carve_engine::terrain::{Terrain, TerrainError, TerrainStats};
use thiserror::Error;

use crate::config::DemoConfig;
use crate::cursor::Cursor;

/// Fixed simulation step
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(Debug, Error)]
enum DemoError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("entity: {0}")]
    Entity(#[from] EntityError),
    #[error("terrain: {0}")]
    Terrain(#[from] TerrainError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
    #[error("sequencing: {0}")]
    Delayed(#[from] DelayedError),
}

/// Screen position of the painting cursor at `t` in [0, 1]
fn cursor_path(screen: Vec2, t: f32) -> Vec2 {
    let angle = t * std::f32::consts::TAU;
    Vec2::new(
        screen.x * (0.5 + 0.35 * angle.cos()),
        screen.y * (0.5 + 0.3 * (2.0 * angle).sin()),
    )
}

fn load_config() -> Result<DemoConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            DemoConfig::load_from_file(&path)?
        }
        None => DemoConfig::default(),
    };
    config.terrain.validate().map_err(ConfigError::from)?;
    Ok(config)
}

fn run(config: &DemoConfig) -> Result<(), DemoError> {
    let physics = BasicPhysicsWorld::with_gravity(Vec2::new(0.0, config.gravity));
    let mut world = EntityWorld::new(Box::new(physics));
    let mut renderer = HeadlessRenderer::new();
    let mut camera = OrthographicCamera::new(config.camera.clone());

    let terrain_id = world.add(Box::new(Terrain::new(config.terrain.clone())?.with_name("Cave")))?;

    let mut carved: DelayedResult<(usize, TerrainStats)> = DelayedResult::new();
    carved.on_complete(|(strokes, stats)| {
        log::info!(
            "Carved {} tunnel strokes: {} leaves ({} solid, {} empty), {} fixtures, depth {}",
            strokes,
            stats.leaves(),
            stats.solid_leaves,
            stats.empty_leaves,
            stats.fixtures,
            stats.deepest
        );
    });

    let strokes = world.with_entity::<Terrain, _>(terrain_id, |terrain, ctx| {
        tunnels::carve(terrain, ctx, &config.tunnels)
    })??;
    if let Some(terrain) = world.entity::<Terrain>(terrain_id) {
        carved.complete((strokes, terrain.stats()))?;
    }

    let bounds = match world.entity::<Terrain>(terrain_id) {
        Some(terrain) => tunnels::terrain_bounds(terrain),
        None => return Err(EntityError::UnknownEntity(terrain_id).into()),
    };
    let center = bounds.center();
    camera.look_at(center);

    let faller_id = world.add(Box::new(
        PhysicalEntity::new("faller", BodyKind::Dynamic, Vec2::new(2.0, 2.0))
            .with_category(CollisionCategory::PLAYER)
            .with_position(Vec2::new(center.x, bounds.min.y + 4.0)),
    ))?;

    let vertices = cursor::quad_vertices(config.paint_radius);
    let quad = renderer.upload(&vertices, &cursor::QUAD_INDICES)?;
    let scene = world.scene_mut();
    let overlay = scene.add_layer(Layer::new("overlay", 10, layer::any_capability(Capabilities::RENDERABLE)));
    let cursor_node = scene.create_child(scene.root(), Some("cursor"))?;
    scene.insert_movable(cursor_node, Box::new(Cursor::new(quad, 2.0)))?;
    log::debug!("Cursor drawn on layer {:?}", overlay);

    let mut time = GameTime::new(0.0, FRAME_TIME);
    let mut painted = 0;
    for frame in 0..config.frames {
        renderer.begin_frame();

        let t = frame as f32 / config.frames.max(1) as f32;
        let target = camera.unproject(cursor_path(camera.screen_size(), t));
        world
            .scene_mut()
            .set_position(cursor_node, Vec3::new(target.x, target.y, 1.0))?;

        let brush = CircleBrush::at(target, config.paint_radius);
        if world.with_entity::<Terrain, _>(terrain_id, |terrain, ctx| terrain.set_quads(ctx, &brush, false, false))?? {
            painted += 1;
        }

        world.update(&time, &camera);

        world.with_entity::<Terrain, _>(terrain_id, |terrain, ctx| terrain.draw(ctx.scene, &mut renderer))??;
        world.scene().draw_layers(&camera, &mut renderer)?;

        if frame % 60 == 0 {
            log::debug!(
                "Frame {}: cursor at ({:.1}, {:.1}), {} draw calls",
                frame,
                target.x,
                target.y,
                renderer.draw_calls().len()
            );
        }
        time = time.advanced(FRAME_TIME);
    }

    if let (Some(terrain), Some(faller)) = (
        world.entity::<Terrain>(terrain_id),
        world.entity::<PhysicalEntity>(faller_id),
    ) {
        let stats = terrain.stats();
        let faller_position = faller.position(world.physics());
        let inside = terrain.is_solid_at(world.scene(), faller_position)?;
        log::info!(
            "Painted {} of {} frames; terrain now has {} leaves in {} blocks",
            painted,
            config.frames,
            stats.leaves(),
            stats.blocks
        );
        log::info!("Falling body ended at ({:.1}, {:.1}), inside solid terrain: {:?}", faller_position.x, faller_position.y, inside);
    }
    log::info!(
        "Renderer: {} uploads, {} live buffers, {} draws in the last frame",
        renderer.upload_count(),
        renderer.live_buffers(),
        renderer.draw_calls().len()
    );

    world.remove(faller_id)?;
    world.remove(terrain_id)?;
    renderer.release(quad)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level(log::LevelFilter::Info);
    log::info!("Starting carve demo");

    let config = load_config()?;
    log::info!(
        "Terrain {}x{} in blocks of {}, depth {}",
        config.terrain.terrain_size[0],
        config.terrain.terrain_size[1],
        config.terrain.block_size,
        config.terrain.max_depth
    );

    match run(&config) {
        Ok(()) => {
            log::info!("Carve demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Carve demo failed: {:?}", e);
            Err(e.into())
        }
    }
}
