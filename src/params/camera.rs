//! Demo camera configuration.

/// Slow automatic orbit around the terrain centre
#[derive(Debug, Clone)]
pub struct OrbitCameraPath {
    /// Horizontal distance from the origin (meters)
    pub radius_m: f32,

    /// Eye height above the origin (meters)
    pub altitude_m: f32,

    /// Angular speed (radians per second)
    pub angular_speed_rad_per_s: f32,

    /// Height of the look-at point (meters)
    pub target_height_m: f32,
}

impl Default for OrbitCameraPath {
    fn default() -> Self {
        Self {
            radius_m: 34.0,
            altitude_m: 9.0,
            angular_speed_rad_per_s: 0.04,
            target_height_m: 0.5,
        }
    }
}
