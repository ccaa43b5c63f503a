//! Runtime tuning knobs for terrain refinement

use crate::core::types::Vec3;
use crate::math::Frustum;
use super::metric::ErrorMetric;

/// Smallest usable pixel tolerance; tightening below this wins nothing
/// visible and explodes the patch count
pub const MIN_PIXEL_TOLERANCE: f32 = 0.5;

/// View and refinement parameters shared by all terrain models
#[derive(Clone, Copy, Debug)]
pub struct LodSettings {
    /// Vertical field of view in degrees
    pub fov_y_deg: f32,
    /// Viewport height in pixels, the extent covered by `fov_y_deg`
    pub screen_height: f32,
    /// Acceptable screen-space error in pixels
    pub tolerance: f32,
    /// When false the frustum accepts everything (debug aid)
    pub frustum_culling: bool,
    /// When false `update` is skipped and the last cut keeps rendering,
    /// letting the camera fly away from a frozen refinement
    pub update_enabled: bool,
    /// Draw patch boundary outlines on top of the terrain
    pub show_outline: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            screen_height: 720.0,
            tolerance: 2.0,
            frustum_culling: true,
            update_enabled: true,
            show_outline: false,
            near: 1.0,
            far: 10000.0,
        }
    }
}

impl LodSettings {
    /// Scale the tolerance, clamped to [`MIN_PIXEL_TOLERANCE`]
    pub fn adjust_tolerance(&mut self, factor: f32) {
        self.tolerance = (self.tolerance * factor).max(MIN_PIXEL_TOLERANCE);
        log::debug!("pixel tolerance now {}", self.tolerance);
    }

    /// Error metric for the given eye position
    pub fn metric(&self, eye: Vec3) -> ErrorMetric {
        let mut metric = ErrorMetric::new(
            self.fov_y_deg.to_radians(),
            self.screen_height,
            self.tolerance,
        );
        metric.set_eye(eye);
        metric
    }

    /// View frustum for the given camera pose and aspect ratio
    pub fn frustum(&self, eye: Vec3, look_at: Vec3, up: Vec3, aspect: f32) -> Frustum {
        let mut frustum =
            Frustum::from_camera(eye, look_at, up, self.fov_y_deg, aspect, self.near, self.far);
        frustum.culling_enabled = self.frustum_culling;
        frustum
    }
}
