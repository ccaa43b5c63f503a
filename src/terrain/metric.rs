//! Screen-space error metric for view-dependent refinement
//!
//! Implements the Lindstrom-style bound: a node with object-space error
//! `e` viewed from squared distance `d2` projects to at most
//! `view_term * e / sqrt(d2)` multiples of the pixel tolerance, where
//! `view_term = pixels_on_fov / (2 tan(fov/2)) / tolerance`.

use crate::core::types::Vec3;
use crate::math::Aabb;

/// Smallest accepted pixel tolerance; smaller values are clamped
const MIN_TOLERANCE: f32 = 1e-3;

/// Per-frame value object combining the eye position with the
/// precomputed view coefficient
#[derive(Clone, Copy, Debug)]
pub struct ErrorMetric {
    eye: Vec3,
    view_term: f32,
}

impl Default for ErrorMetric {
    fn default() -> Self {
        Self::new(45.0_f32.to_radians(), 720.0, 1.0)
    }
}

impl ErrorMetric {
    /// Create a metric with the eye at the origin.
    /// `fov_y` is in radians, `pixels_on_fov` the viewport extent covered
    /// by that field of view, `tolerance` the acceptable error in pixels.
    pub fn new(fov_y: f32, pixels_on_fov: f32, tolerance: f32) -> Self {
        let mut metric = Self {
            eye: Vec3::ZERO,
            view_term: 0.0,
        };
        metric.set_view_params(fov_y, pixels_on_fov, tolerance);
        metric
    }

    /// Create a metric from an already-computed view coefficient
    pub fn with_view_term(eye: Vec3, view_term: f32) -> Self {
        Self { eye, view_term }
    }

    /// Recompute the view coefficient. A non-positive tolerance is
    /// clamped to a minimum instead of dividing by zero.
    pub fn set_view_params(&mut self, fov_y: f32, pixels_on_fov: f32, tolerance: f32) {
        let tolerance = if tolerance <= 0.0 {
            log::warn!("non-positive pixel tolerance {tolerance}, clamping to {MIN_TOLERANCE}");
            MIN_TOLERANCE
        } else {
            tolerance
        };
        let lambda = pixels_on_fov / (2.0 * (fov_y * 0.5).tan());
        self.view_term = lambda / tolerance;
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn set_eye(&mut self, eye: Vec3) {
        self.eye = eye;
    }

    pub fn view_term(&self) -> f32 {
        self.view_term
    }

    /// Whether a node with the given bounds and object-space error still
    /// exceeds the pixel tolerance from the current eye point.
    ///
    /// Returns true when the traversal must descend to the children;
    /// false when this node is an acceptable representative. Distance is
    /// measured to the nearest point of the box, not its center.
    pub fn needs_refinement(&self, bounds: &Aabb, error: f32) -> bool {
        let dist2 = bounds.distance_squared_to_point(self.eye);
        let screen = self.view_term * error;
        screen * screen > dist2
    }

    /// Bounding-sphere variant of [`Self::needs_refinement`]
    pub fn needs_refinement_sphere(&self, center: Vec3, radius: f32, error: f32) -> bool {
        let mag2 = (center - self.eye).length_squared();
        let dist = self.view_term * error + radius;
        dist * dist > mag2
    }
}
