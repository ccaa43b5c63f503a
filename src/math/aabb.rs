//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that becomes valid after the first `expand` call
    pub fn inverted() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Squared distance from a point to the nearest point of the box
    /// (zero if the point is inside)
    pub fn distance_squared_to_point(&self, p: Vec3) -> f32 {
        let nearest = p.clamp(self.min, self.max);
        (p - nearest).length_squared()
    }

    /// Get child quadrant AABB for quadtree subdivision on the XZ plane.
    /// index: 0-3 (bit 0 = east half, bit 1 = north half); Y extent is kept.
    pub fn child_quadrant(&self, index: u8) -> Aabb {
        let center = self.center();
        let min = Vec3::new(
            if index & 1 != 0 { center.x } else { self.min.x },
            self.min.y,
            if index & 2 != 0 { center.z } else { self.min.z },
        );
        let max = Vec3::new(
            if index & 1 != 0 { self.max.x } else { center.x },
            self.max.y,
            if index & 2 != 0 { self.max.z } else { center.z },
        );
        Aabb::new(min, max)
    }
}
