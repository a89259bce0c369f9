//! Demo camera slowly orbiting the terrain centre.

use glam::{Mat4, Vec3};

use crate::params::{OrbitCameraPath, RenderConfig};

/// Camera following a circular path around the origin
pub struct CameraSystem {
    path: OrbitCameraPath,
}

impl CameraSystem {
    pub fn new(path: OrbitCameraPath) -> Self {
        Self { path }
    }

    /// Compute camera position and look-at target for given time
    ///
    /// # Returns
    /// Tuple of (eye_position, target_position)
    pub fn compute_position_and_target(&self, time_s: f32) -> (Vec3, Vec3) {
        let p = &self.path;
        let angle = time_s * p.angular_speed_rad_per_s;
        let eye = Vec3::new(angle.cos() * p.radius_m, p.altitude_m, angle.sin() * p.radius_m);
        let target = Vec3::new(0.0, p.target_height_m, 0.0);
        (eye, target)
    }

    /// Create view-projection matrix for rendering
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, camera_position)
    pub fn create_view_proj_matrix(
        &self,
        time_s: f32,
        render_config: &RenderConfig,
    ) -> (Mat4, Vec3) {
        let (eye, target) = self.compute_position_and_target(time_s);

        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane_m,
            render_config.far_plane_m,
        );

        (proj * view, eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_keeps_radius_and_altitude() {
        let path = OrbitCameraPath::default();
        let camera = CameraSystem::new(path.clone());
        for t in 0..50 {
            let (eye, target) = camera.compute_position_and_target(t as f32 * 3.0);
            let horizontal = Vec3::new(eye.x, 0.0, eye.z).length();
            assert!((horizontal - path.radius_m).abs() < 1e-3);
            assert_eq!(eye.y, path.altitude_m);
            assert_eq!(target, Vec3::new(0.0, path.target_height_m, 0.0));
        }
    }

    #[test]
    fn test_orbit_stays_inside_plateau() {
        // The eye must not sit over the skirt
        let camera = CameraSystem::new(OrbitCameraPath::default());
        let (eye, _) = camera.compute_position_and_target(0.0);
        assert!(Vec3::new(eye.x, 0.0, eye.z).length() < 40.0);
    }

    #[test]
    fn test_view_proj_matrix_generation() {
        let camera = CameraSystem::new(OrbitCameraPath::default());
        let (view_proj, eye) = camera.create_view_proj_matrix(10.0, &RenderConfig::default());

        assert_ne!(view_proj, Mat4::IDENTITY);
        assert_ne!(view_proj, Mat4::ZERO);
        assert!(eye.is_finite());

        // The look-at point lands in the middle of the screen
        let clip = view_proj * glam::Vec4::new(0.0, 0.5, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-4);
        assert!((clip.y / clip.w).abs() < 1e-4);
    }
}
