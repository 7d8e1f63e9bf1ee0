//! Procedural tunnels carved as random walks of circle strokes

use carve_engine::entity::WorldContext;
use carve_engine::foundation::math::Vec2;
use carve_engine::spatial::{Aabb2, CircleBrush};
use carve_engine::terrain::{Terrain, TerrainError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TunnelConfig;

/// World bounds covered by the terrain
pub fn terrain_bounds(terrain: &Terrain) -> Aabb2 {
    let config = terrain.config();
    let origin = Vec2::new(config.origin[0], config.origin[1]);
    let size = Vec2::new(config.terrain_size[0], config.terrain_size[1]);
    Aabb2::new(origin, origin + size)
}

/// Carve every tunnel with deferred geometry, then rebuild once
///
/// Returns the number of strokes that changed the terrain.
pub fn carve(terrain: &mut Terrain, ctx: &mut WorldContext<'_>, config: &TunnelConfig) -> Result<usize, TerrainError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let bounds = terrain_bounds(terrain);
    let size = bounds.size();
    let mut changed = 0;

    for tunnel in 0..config.count {
        let mut position = bounds.min + Vec2::new(rng.gen_range(0.0..size.x), rng.gen_range(0.0..size.y));
        let mut heading: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        log::debug!("Tunnel {} starts at {:?}", tunnel, position);

        for _ in 0..config.segments {
            let radius = rng.gen_range(config.min_radius..=config.max_radius);
            if terrain.set_quads(ctx, &CircleBrush::at(position, radius), false, true)? {
                changed += 1;
            }

            heading += rng.gen_range(-config.max_turn..=config.max_turn);
            let next = position + Vec2::new(heading.cos(), heading.sin()) * config.step;
            if bounds.contains_point(next) {
                position = next;
            } else {
                // Turn back into the terrain
                heading += std::f32::consts::PI;
            }
        }
    }

    terrain.refresh();
    Ok(changed)
}
