//! Randomised checks that every node's global transform is its parent's
//! global transform composed with its local transform

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::scene::{NodeId, SceneGraph};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_DEPTH: usize = 5;

    fn depth(scene: &SceneGraph, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = scene.parent(id).unwrap() {
            depth += 1;
            id = parent;
        }
        depth
    }

    fn subtree_height(scene: &SceneGraph, id: NodeId) -> usize {
        scene
            .children(id)
            .unwrap()
            .iter()
            .map(|child| 1 + subtree_height(scene, *child))
            .max()
            .unwrap_or(0)
    }

    fn random_position(rng: &mut StdRng) -> Vec3 {
        Vec3::new(
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-5.0..5.0),
        )
    }

    fn random_rotation(rng: &mut StdRng) -> Quat {
        Quat::from_euler_angles(
            rng.gen_range(-0.5..0.5),
            rng.gen_range(-0.5..0.5),
            rng.gen_range(-3.1..3.1),
        )
    }

    fn random_scale(rng: &mut StdRng) -> Vec3 {
        Vec3::new(
            rng.gen_range(0.5..2.0),
            rng.gen_range(0.5..2.0),
            rng.gen_range(0.5..2.0),
        )
    }

    fn assert_consistent(scene: &SceneGraph, nodes: &[NodeId]) {
        for &id in nodes {
            let global = scene.global_transform(id).unwrap();
            let local = scene.local_transform(id).unwrap();
            let expected = match scene.parent(id).unwrap() {
                Some(parent) => scene.global_transform(parent).unwrap().combine(&local),
                None => local,
            };

            assert_relative_eq!(global.position, expected.position, epsilon = 1e-2, max_relative = 1e-3);
            assert_relative_eq!(global.scale, expected.scale, epsilon = 1e-4, max_relative = 1e-3);
            assert!(
                global.rotation.angle_to(&expected.rotation) < 1e-3,
                "rotation mismatch on {id:?}"
            );
        }
    }

    fn run(seed: u64, steps: usize) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = SceneGraph::new();
        let mut nodes = vec![scene.root()];

        for _ in 0..12 {
            let candidates: Vec<NodeId> = nodes
                .iter()
                .copied()
                .filter(|id| depth(&scene, *id) < MAX_DEPTH)
                .collect();
            let parent = candidates[rng.gen_range(0..candidates.len())];
            let child = scene.create_child(parent, None).unwrap();
            scene
                .set_local_transform(
                    child,
                    Transform::new(random_position(&mut rng), random_rotation(&mut rng), random_scale(&mut rng)),
                )
                .unwrap();
            nodes.push(child);
        }
        assert_consistent(&scene, &nodes);

        for _ in 0..steps {
            let id = nodes[rng.gen_range(1..nodes.len())];
            match rng.gen_range(0..8) {
                0 => scene.set_local_position(id, random_position(&mut rng)).unwrap(),
                1 => scene.set_local_orientation(id, random_rotation(&mut rng)).unwrap(),
                2 => scene.set_local_scale(id, random_scale(&mut rng)).unwrap(),
                3 => scene.set_position(id, random_position(&mut rng)).unwrap(),
                4 => scene.set_orientation(id, random_rotation(&mut rng)).unwrap(),
                5 => scene.set_scale(id, random_scale(&mut rng)).unwrap(),
                6 => scene.transform_local_to_global(id).unwrap(),
                _ => {
                    let parent = nodes[rng.gen_range(0..nodes.len())];
                    if depth(&scene, parent) + 1 + subtree_height(&scene, id) <= MAX_DEPTH {
                        scene.reparent(id, Some(parent)).unwrap();
                    }
                }
            }
            assert_consistent(&scene, &nodes);
        }
    }

    #[test]
    fn test_random_edits_keep_hierarchy_consistent() {
        for seed in [1, 7, 42, 1234] {
            run(seed, 200);
        }
    }

    #[test]
    fn test_reparent_cycle_attempts_are_harmless() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut scene = SceneGraph::new();
        let a = scene.create_child(scene.root(), Some("a")).unwrap();
        let b = scene.create_child(a, Some("b")).unwrap();
        let c = scene.create_child(b, Some("c")).unwrap();
        for id in [a, b, c] {
            scene.set_local_position(id, random_position(&mut rng)).unwrap();
        }

        scene.reparent(a, Some(c)).unwrap();
        scene.reparent(b, Some(b)).unwrap();

        assert_eq!(scene.parent(a).unwrap(), Some(scene.root()));
        assert_eq!(scene.parent(b).unwrap(), Some(a));
        assert_consistent(&scene, &[a, b, c]);
    }
}
