//! In-memory physics backend
//!
//! Keeps bodies and fixtures in slot maps and integrates dynamic bodies with
//! their linear velocity. There is no collision response; it exists so terrain
//! edits can be observed without a real engine.

use nalgebra::Rotation2;
use slotmap::SlotMap;

use super::{BodyHandle, BodyKind, CollisionCategory, FixtureHandle, PhysicsError, PhysicsWorld};
use crate::foundation::math::Vec2;

/// A body record
#[derive(Debug, Clone)]
pub struct Body {
    /// Simulation mode
    pub kind: BodyKind,
    /// World position
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Linear velocity, only used by dynamic bodies
    pub linear_velocity: Vec2,
    /// Fixtures in attachment order
    pub fixtures: Vec<FixtureHandle>,
}

/// A rectangle fixture record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixture {
    /// Owning body
    pub body: BodyHandle,
    /// Rectangle width
    pub width: f32,
    /// Rectangle height
    pub height: f32,
    /// Center relative to the body
    pub offset: Vec2,
    /// Filtering category
    pub category: CollisionCategory,
}

/// Reference [`PhysicsWorld`] that records state without solving contacts
#[derive(Debug, Default)]
pub struct BasicPhysicsWorld {
    bodies: SlotMap<BodyHandle, Body>,
    fixtures: SlotMap<FixtureHandle, Fixture>,
    gravity: Vec2,
}

impl BasicPhysicsWorld {
    /// Create an empty world without gravity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty world with gravity applied to dynamic bodies
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Look up a fixture
    pub fn fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle)
    }

    /// Set a body's linear velocity
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::UnknownBody(handle))?;
        body.linear_velocity = velocity;
        Ok(())
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live fixtures across all bodies
    pub fn total_fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Check whether a world point lies inside any fixture of the given categories
    ///
    /// Fixtures turn with their body, so the point is tested in the body's frame.
    pub fn query_point(&self, point: Vec2, mask: CollisionCategory) -> bool {
        self.fixtures.values().any(|fixture| {
            if !mask.intersects(fixture.category) {
                return false;
            }
            let Some(body) = self.bodies.get(fixture.body) else {
                return false;
            };
            let local = Rotation2::new(-body.rotation) * (point - body.position) - fixture.offset;
            local.x.abs() <= fixture.width * 0.5 && local.y.abs() <= fixture.height * 0.5
        })
    }
}

impl PhysicsWorld for BasicPhysicsWorld {
    fn create_body(&mut self, kind: BodyKind, position: Vec2) -> BodyHandle {
        self.bodies.insert(Body {
            kind,
            position,
            rotation: 0.0,
            linear_velocity: Vec2::zeros(),
            fixtures: Vec::new(),
        })
    }

    fn attach_rectangle_fixture(
        &mut self,
        body: BodyHandle,
        width: f32,
        height: f32,
        offset: Vec2,
        category: CollisionCategory,
    ) -> Result<FixtureHandle, PhysicsError> {
        if !self.bodies.contains_key(body) {
            return Err(PhysicsError::UnknownBody(body));
        }

        let handle = self.fixtures.insert(Fixture {
            body,
            width,
            height,
            offset,
            category,
        });
        if let Some(record) = self.bodies.get_mut(body) {
            record.fixtures.push(handle);
        }
        Ok(handle)
    }

    fn destroy_fixture(&mut self, fixture: FixtureHandle) -> Result<(), PhysicsError> {
        let removed = self.fixtures.remove(fixture).ok_or(PhysicsError::UnknownFixture(fixture))?;
        if let Some(body) = self.bodies.get_mut(removed.body) {
            body.fixtures.retain(|handle| *handle != fixture);
        }
        Ok(())
    }

    fn dispose_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        let removed = self.bodies.remove(body).ok_or(PhysicsError::UnknownBody(body))?;
        for fixture in removed.fixtures {
            self.fixtures.remove(fixture);
        }
        Ok(())
    }

    fn body_transform(&self, body: BodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(body).map(|record| (record.position, record.rotation))
    }

    fn set_body_transform(&mut self, body: BodyHandle, position: Vec2, rotation: f32) -> Result<(), PhysicsError> {
        let record = self.bodies.get_mut(body).ok_or(PhysicsError::UnknownBody(body))?;
        record.position = position;
        record.rotation = rotation;
        Ok(())
    }

    fn fixture_count(&self, body: BodyHandle) -> usize {
        self.bodies.get(body).map_or(0, |record| record.fixtures.len())
    }

    fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if body.kind == BodyKind::Dynamic {
                body.linear_velocity += self.gravity * dt;
                body.position += body.linear_velocity * dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dispose_body_releases_fixtures() {
        let mut world = BasicPhysicsWorld::new();
        let body = world.create_body(BodyKind::Static, Vec2::new(10.0, 0.0));
        world
            .attach_rectangle_fixture(body, 2.0, 2.0, Vec2::zeros(), CollisionCategory::TERRAIN)
            .unwrap();
        world
            .attach_rectangle_fixture(body, 2.0, 2.0, Vec2::new(4.0, 0.0), CollisionCategory::TERRAIN)
            .unwrap();
        assert_eq!(world.fixture_count(body), 2);

        world.dispose_body(body).unwrap();

        assert_eq!(world.total_fixture_count(), 0);
        assert_eq!(world.fixture_count(body), 0);
        assert_eq!(world.dispose_body(body), Err(PhysicsError::UnknownBody(body)));
    }

    #[test]
    fn test_destroy_fixture_twice_fails() {
        let mut world = BasicPhysicsWorld::new();
        let body = world.create_body(BodyKind::Static, Vec2::zeros());
        let fixture = world
            .attach_rectangle_fixture(body, 1.0, 1.0, Vec2::zeros(), CollisionCategory::DEFAULT)
            .unwrap();

        assert!(world.destroy_fixture(fixture).is_ok());
        assert_eq!(world.destroy_fixture(fixture), Err(PhysicsError::UnknownFixture(fixture)));
    }

    #[test]
    fn test_query_point_respects_body_offset_and_mask() {
        let mut world = BasicPhysicsWorld::new();
        let body = world.create_body(BodyKind::Static, Vec2::new(100.0, 0.0));
        world
            .attach_rectangle_fixture(body, 4.0, 4.0, Vec2::new(2.0, 2.0), CollisionCategory::TERRAIN)
            .unwrap();

        assert!(world.query_point(Vec2::new(103.0, 3.0), CollisionCategory::TERRAIN));
        assert!(!world.query_point(Vec2::new(103.0, 3.0), CollisionCategory::PLAYER));
        assert!(!world.query_point(Vec2::new(3.0, 3.0), CollisionCategory::all()));
    }

    #[test]
    fn test_query_point_follows_body_rotation() {
        let mut world = BasicPhysicsWorld::new();
        let body = world.create_body(BodyKind::Dynamic, Vec2::zeros());
        world
            .attach_rectangle_fixture(body, 4.0, 2.0, Vec2::new(3.0, 0.0), CollisionCategory::PLAYER)
            .unwrap();
        world
            .set_body_transform(body, Vec2::zeros(), std::f32::consts::FRAC_PI_2)
            .unwrap();

        // A quarter turn swings the fixture from the +x axis onto the +y axis
        assert!(world.query_point(Vec2::new(0.0, 4.5), CollisionCategory::PLAYER));
        assert!(world.query_point(Vec2::new(0.8, 3.0), CollisionCategory::PLAYER));
        assert!(!world.query_point(Vec2::new(3.0, 0.0), CollisionCategory::PLAYER));
        assert!(!world.query_point(Vec2::new(1.5, 3.0), CollisionCategory::PLAYER));
    }

    #[test]
    fn test_step_moves_only_dynamic_bodies() {
        let mut world = BasicPhysicsWorld::with_gravity(Vec2::new(0.0, -10.0));
        let ground = world.create_body(BodyKind::Static, Vec2::zeros());
        let ball = world.create_body(BodyKind::Dynamic, Vec2::new(0.0, 10.0));

        world.step(0.5);

        let (ground_position, _) = world.body_transform(ground).unwrap();
        let (ball_position, _) = world.body_transform(ball).unwrap();
        assert_eq!(ground_position, Vec2::zeros());
        assert_relative_eq!(ball_position.y, 7.5, epsilon = 1e-5);
    }
}
