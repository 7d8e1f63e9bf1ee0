//! Terrain brushes
//!
//! A brush is a query volume placed in world space. Quadtree edits classify
//! each node's world bounds against it.

use crate::foundation::math::Vec2;
use super::bounds::{Aabb2, Containment};

/// A region used to enable or disable terrain
pub trait TerrainBrush {
    /// Center of the brush in world space
    fn position(&self) -> Vec2;

    /// Move the brush center
    fn set_position(&mut self, position: Vec2);

    /// Classify a world-space box against the brush
    fn containment(&self, bounds: &Aabb2) -> Containment;

    /// Conservative world-space bounds, used to skip whole blocks
    fn bounds(&self) -> Aabb2;
}

/// A circular brush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleBrush {
    center: Vec2,
    radius: f32,
}

impl CircleBrush {
    /// Create a circle brush centered at the origin
    pub fn new(radius: f32) -> Self {
        Self::at(Vec2::zeros(), radius)
    }

    /// Create a circle brush at a position
    pub fn at(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Circle radius
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl TerrainBrush for CircleBrush {
    fn position(&self) -> Vec2 {
        self.center
    }

    fn set_position(&mut self, position: Vec2) {
        self.center = position;
    }

    fn containment(&self, bounds: &Aabb2) -> Containment {
        let radius_squared = self.radius * self.radius;

        let closest = bounds.closest_point(self.center);
        if (closest - self.center).magnitude_squared() >= radius_squared {
            return Containment::Disjoint;
        }

        let all_corners_inside = bounds
            .corners()
            .iter()
            .all(|corner| (corner - self.center).magnitude_squared() <= radius_squared);

        if all_corners_inside {
            Containment::Contains
        } else {
            Containment::Intersects
        }
    }

    fn bounds(&self) -> Aabb2 {
        Aabb2::from_center_extents(self.center, Vec2::new(self.radius, self.radius))
    }
}

/// An axis-aligned rectangular brush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleBrush {
    bounds: Aabb2,
}

impl RectangleBrush {
    /// Create a rectangle brush centered at the origin
    pub fn new(size: Vec2) -> Self {
        Self::at(Vec2::zeros(), size)
    }

    /// Create a rectangle brush centered at a position
    pub fn at(center: Vec2, size: Vec2) -> Self {
        Self {
            bounds: Aabb2::from_center_extents(center, size * 0.5),
        }
    }

    /// Create a rectangle brush covering exactly the given box
    pub fn covering(bounds: Aabb2) -> Self {
        Self { bounds }
    }

    /// Rectangle size
    pub fn size(&self) -> Vec2 {
        self.bounds.size()
    }
}

impl TerrainBrush for RectangleBrush {
    fn position(&self) -> Vec2 {
        self.bounds.center()
    }

    fn set_position(&mut self, position: Vec2) {
        self.bounds = Aabb2::from_center_extents(position, self.bounds.size() * 0.5);
    }

    fn containment(&self, bounds: &Aabb2) -> Containment {
        self.bounds.containment(bounds)
    }

    fn bounds(&self) -> Aabb2 {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_containment() {
        let brush = CircleBrush::at(Vec2::new(0.0, 0.0), 10.0);

        let inside = Aabb2::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let straddling = Aabb2::new(Vec2::new(5.0, 5.0), Vec2::new(15.0, 15.0));
        let outside = Aabb2::new(Vec2::new(20.0, 20.0), Vec2::new(30.0, 30.0));

        assert_eq!(brush.containment(&inside), Containment::Contains);
        assert_eq!(brush.containment(&straddling), Containment::Intersects);
        assert_eq!(brush.containment(&outside), Containment::Disjoint);
    }

    #[test]
    fn test_circle_touching_box_is_disjoint() {
        let brush = CircleBrush::at(Vec2::new(0.0, 0.0), 10.0);
        let touching = Aabb2::new(Vec2::new(10.0, -1.0), Vec2::new(12.0, 1.0));

        assert_eq!(brush.containment(&touching), Containment::Disjoint);
    }

    #[test]
    fn test_rectangle_move_keeps_size() {
        let mut brush = RectangleBrush::new(Vec2::new(4.0, 2.0));
        brush.set_position(Vec2::new(10.0, 10.0));

        assert_eq!(brush.size(), Vec2::new(4.0, 2.0));
        assert_eq!(brush.bounds().min, Vec2::new(8.0, 9.0));
    }
}
