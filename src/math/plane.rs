//! Plane in Hessian normal form

use crate::core::types::Vec3;

/// A plane defined by normal and signed distance from origin
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Build a plane from three counter-clockwise points.
    /// The normal points toward the viewer of the CCW winding.
    ///
    /// The points must not be collinear; the normal is undefined otherwise
    /// (caller precondition, asserted in debug builds).
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (c - b).cross(a - b);
        debug_assert!(normal.length_squared() > 0.0, "collinear plane points");
        let normal = normal.normalize();
        Self {
            normal,
            d: -normal.dot(b),
        }
    }

    /// Build a plane from the coefficients of `ax + by + cz + d = 0`,
    /// normalizing so the normal has unit length
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let len = Vec3::new(a, b, c).length();
        Self {
            normal: Vec3::new(a, b, c) / len,
            d: d / len,
        }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}
