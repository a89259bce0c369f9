//! Day/night cycle colour bands, lighting and fog parameters.

use crate::color::Rgb;
use crate::error::ParamsError;

/// Day/night cycle parameters. Phase 0 and 1 are midnight, 0.5 is noon.
#[derive(Debug, Clone)]
pub struct CycleParams {
    /// Band edges: night ends, dawn peaks, day begins, day ends, dusk peaks, night begins
    pub breakpoints: [f32; 6],

    /// Night sky colour
    pub night_color: Rgb,

    /// Accent colour reached at the dawn breakpoint
    pub dawn_color: Rgb,

    /// Accent colour reached at the dusk breakpoint
    pub dusk_color: Rgb,

    /// Directional light colour at solar noon
    pub sunlight_color: Rgb,

    /// Directional light colour at night
    pub moonlight_color: Rgb,

    /// Light intensity floor that remains at night
    pub moonlight_intensity: f32,

    /// Extra light intensity at solar noon (added to the floor)
    pub sun_peak_intensity: f32,

    /// Sun elevation over which the sun contribution fades in after sunrise
    pub horizon_fade: f32,

    /// Ambient intensity at midnight and at noon
    pub ambient_night: f32,
    pub ambient_day: f32,

    /// Radius of the light's circular path (meters)
    pub sun_orbit_radius_m: f32,

    /// Depth flattening of the light path (z = cos(angle) * k)
    pub sun_depth_factor: f32,

    /// Exponential fog density at night and at noon
    pub fog_density_night: f32,
    pub fog_density_day: f32,

    /// Linear fog start distance at night and at noon (meters)
    pub fog_near_night_m: f32,
    pub fog_near_day_m: f32,

    /// Linear fog end distance at night and at noon (meters)
    pub fog_far_night_m: f32,
    pub fog_far_day_m: f32,

    /// Rate at which displayed colours chase their per-frame target (1/seconds)
    pub color_rate_per_s: f32,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            breakpoints: [0.2, 0.3, 0.4, 0.6, 0.7, 0.8],
            night_color: Rgb::from_u8(0x05, 0x05, 0x10),
            dawn_color: Rgb::from_u8(0xFF, 0x9A, 0x8B), // Peach
            dusk_color: Rgb::from_u8(0xFD, 0x5E, 0x53), // Coral
            sunlight_color: Rgb::from_u8(0xFF, 0xF4, 0xE0),
            moonlight_color: Rgb::from_u8(0x8C, 0x9E, 0xD0),
            moonlight_intensity: 0.1,
            sun_peak_intensity: 1.9,
            horizon_fade: 0.1,
            ambient_night: 0.15,
            ambient_day: 0.5,
            sun_orbit_radius_m: 50.0,
            sun_depth_factor: 0.3,
            fog_density_night: 0.035,
            fog_density_day: 0.012,
            fog_near_night_m: 10.0,
            fog_near_day_m: 20.0,
            fog_far_night_m: 80.0,
            fog_far_day_m: 100.0,
            color_rate_per_s: 2.0,
        }
    }
}

impl CycleParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let b = self.breakpoints;
        let increasing = b.windows(2).all(|w| w[0] < w[1]);
        if !increasing || b[0] <= 0.0 || b[5] >= 1.0 {
            return Err(ParamsError::PhaseBreakpoints(b));
        }
        for (name, value) in [
            ("color_rate_per_s", self.color_rate_per_s),
            ("sun_orbit_radius_m", self.sun_orbit_radius_m),
            ("horizon_fade", self.horizon_fade),
        ] {
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}
