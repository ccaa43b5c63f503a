//! View frustum for culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;
use super::plane::Plane;

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom).
/// All plane normals point inward, so a point is inside when its signed
/// distance to every plane is non-negative.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
    /// When false, every intersection query returns true (debug toggle)
    pub culling_enabled: bool,
}

impl Frustum {
    /// Build the frustum from camera parameters.
    ///
    /// Computes the 8 corner points from the camera basis
    /// (forward = normalize(eye - look_at), right = normalize(up x forward),
    /// true up = forward x right) and derives the planes from
    /// counter-clockwise corner triples.
    pub fn from_camera(
        eye: Vec3,
        look_at: Vec3,
        up: Vec3,
        fov_y_deg: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let z = (eye - look_at).normalize();
        let x = up.cross(z).normalize();
        let y = z.cross(x);

        let tang = (fov_y_deg.to_radians() * 0.5).tan();
        let nh = near * tang;
        let nw = nh * aspect;
        let fh = far * tang;
        let fw = fh * aspect;

        let nc = eye - z * near;
        let fc = eye - z * far;

        let ntl = nc + y * nh - x * nw;
        let ntr = nc + y * nh + x * nw;
        let nbl = nc - y * nh - x * nw;
        let nbr = nc - y * nh + x * nw;

        let ftl = fc + y * fh - x * fw;
        let ftr = fc + y * fh + x * fw;
        let fbl = fc - y * fh - x * fw;
        let fbr = fc - y * fh + x * fw;

        Self {
            planes: [
                Plane::from_points(ntl, ntr, nbr), // near
                Plane::from_points(ftr, ftl, fbl), // far
                Plane::from_points(ntl, nbl, fbl), // left
                Plane::from_points(nbr, ntr, fbr), // right
                Plane::from_points(ntr, ntl, ftl), // top
                Plane::from_points(nbl, nbr, fbr), // bottom
            ],
            culling_enabled: true,
        }
    }

    /// Extract frustum planes from a view-projection matrix
    /// (Gribb/Hartmann method)
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        // row3 +/- row2
        let near = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][2],
            m[1][3] + m[1][2],
            m[2][3] + m[2][2],
            m[3][3] + m[3][2],
        ));
        let far = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][2],
            m[1][3] - m[1][2],
            m[2][3] - m[2][2],
            m[3][3] - m[3][2],
        ));

        // row3 +/- row0
        let left = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][0],
            m[1][3] + m[1][0],
            m[2][3] + m[2][0],
            m[3][3] + m[3][0],
        ));
        let right = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][0],
            m[1][3] - m[1][0],
            m[2][3] - m[2][0],
            m[3][3] - m[3][0],
        ));

        // row3 +/- row1
        let bottom = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][1],
            m[1][3] + m[1][1],
            m[2][3] + m[2][1],
            m[3][3] + m[3][1],
        ));
        let top = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][1],
            m[1][3] - m[1][1],
            m[2][3] - m[2][1],
            m[3][3] - m[3][1],
        ));

        Self {
            planes: [near, far, left, right, top, bottom],
            culling_enabled: true,
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        Plane::from_coefficients(plane.x, plane.y, plane.z, plane.w)
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        for plane in &self.planes {
            if plane.distance_to_point(point) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Check if a sphere intersects the frustum
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        if !self.culling_enabled {
            return true;
        }
        for plane in &self.planes {
            if plane.distance_to_point(center) < -radius {
                return false;
            }
        }
        true
    }

    /// Check if AABB intersects frustum (conservative test).
    /// Boxes straddling a plane are reported as intersecting; false is
    /// returned only when the box is provably outside at least one plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if !self.culling_enabled {
            return true;
        }
        for plane in &self.planes {
            // Find the corner most aligned with plane normal (p-vertex)
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            // If p-vertex is outside, AABB is completely outside
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}
