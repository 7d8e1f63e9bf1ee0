//! Axis-aligned bounds and containment classification

use crate::foundation::math::Vec2;

/// How a query volume relates to a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// No overlap with positive area
    Disjoint,
    /// Partial overlap
    Intersects,
    /// The box lies entirely inside the query volume
    Contains,
}

/// Axis-Aligned Bounding Box in the terrain plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    /// Minimum corner of the bounding box
    pub min: Vec2,
    /// Maximum corner of the bounding box
    pub max: Vec2,
}

impl Aabb2 {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec2, extents: Vec2) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Shift by an offset
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Check if this AABB contains a point (boundary inclusive)
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y
    }

    /// Check if `other` lies completely inside this box (boundary inclusive)
    pub fn contains_box(&self, other: &Aabb2) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y
    }

    /// Check if the overlap with another AABB has positive area
    pub fn overlaps(&self, other: &Aabb2) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y
    }

    /// Classify `other` against this box
    pub fn containment(&self, other: &Aabb2) -> Containment {
        if !self.overlaps(other) {
            Containment::Disjoint
        } else if self.contains_box(other) {
            Containment::Contains
        } else {
            Containment::Intersects
        }
    }

    /// Closest point of the box to `point`
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// The four corners: (min,min), (max,min), (max,max), (min,max)
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Split into four quadrants: (min,min), (max-x,min-y), (min-x,max-y), (max,max)
    pub fn quadrants(&self) -> [Aabb2; 4] {
        let min = self.min;
        let max = self.max;
        let center = self.center();
        [
            Aabb2::new(min, center),
            Aabb2::new(Vec2::new(center.x, min.y), Vec2::new(max.x, center.y)),
            Aabb2::new(Vec2::new(min.x, center.y), Vec2::new(center.x, max.y)),
            Aabb2::new(center, max),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb2 {
        Aabb2::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0))
    }

    #[test]
    fn test_touching_boxes_are_disjoint() {
        let right = Aabb2::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        assert_eq!(unit_box().containment(&right), Containment::Disjoint);
    }

    #[test]
    fn test_identical_box_is_contained() {
        assert_eq!(unit_box().containment(&unit_box()), Containment::Contains);
    }

    #[test]
    fn test_partial_overlap_intersects() {
        let shifted = unit_box().translated(Vec2::new(0.5, 0.5));
        assert_eq!(unit_box().containment(&shifted), Containment::Intersects);
    }

    #[test]
    fn test_quadrants_tile_parent() {
        let parent = Aabb2::new(Vec2::new(-2.0, 4.0), Vec2::new(6.0, 12.0));
        let quadrants = parent.quadrants();

        let area: f32 = quadrants.iter().map(|q| q.size().x * q.size().y).sum();
        assert_eq!(area, 64.0);
        for quadrant in &quadrants {
            assert!(parent.contains_box(quadrant));
        }
        assert_eq!(quadrants[0].min, parent.min);
        assert_eq!(quadrants[3].max, parent.max);
    }
}
