//! Day/night colour model: phase bands, dayness curves and sun placement.
//!
//! Phase runs 0 (midnight) → 0.25 (sunrise) → 0.5 (noon) → 0.75 (sunset) → 1
//! (midnight again). Functions here expect a phase already wrapped into
//! [0, 1); use [`wrap_phase`] at the boundary where phases enter the system.

use std::f32::consts::PI;

use glam::Vec3;

use crate::biome::Palette;
use crate::color::Rgb;
use crate::math::{lerp, smoothstep};
use crate::params::CycleParams;

/// Wrap any phase into [0, 1). Non-finite input maps to midnight.
pub fn wrap_phase(phase: f32) -> f32 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid rounds tiny negatives up to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

/// "How much day" it is: `sin(phase * π)`, 0 at both midnights, 1 at noon
pub fn dayness(phase: f32) -> f32 {
    (phase * PI).sin().max(0.0)
}

/// Fog response to dayness (quadratic: fog lifts late in the morning)
pub fn fog_response(dayness: f32) -> f32 {
    dayness * dayness
}

/// Light response to dayness (square root: light comes up quickly)
pub fn light_response(dayness: f32) -> f32 {
    dayness.max(0.0).sqrt()
}

/// Star-field opacity for a given dayness
pub fn star_opacity(dayness: f32) -> f32 {
    (1.0 - dayness).clamp(0.0, 1.0)
}

/// Everything lighting-related derived from one phase and palette.
/// Recomputed every frame, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub sky: Rgb,
    pub fog: Rgb,
    /// Exponential fog density (1/meters)
    pub fog_density: f32,
    /// Linear fog start and end distances (meters)
    pub fog_near: f32,
    pub fog_far: f32,
    pub light_color: Rgb,
    pub light_intensity: f32,
    pub ambient_intensity: f32,
    /// Unit vector pointing from the ground toward the light
    pub light_direction: Vec3,
}

/// Maps a phase and biome palette to sky, fog and light state
#[derive(Debug, Clone)]
pub struct CycleColorModel {
    params: CycleParams,
}

impl CycleColorModel {
    pub fn new(params: CycleParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CycleParams {
        &self.params
    }

    /// Walk the night → dawn → day → dusk → night bands
    fn band_color(&self, phase: f32, night: Rgb, dawn: Rgb, day: Rgb, dusk: Rgb) -> Rgb {
        let [night_end, dawn_peak, day_start, day_end, dusk_peak, night_start] =
            self.params.breakpoints;

        if phase < night_end {
            night
        } else if phase < dawn_peak {
            night.lerp(dawn, smoothstep(night_end, dawn_peak, phase))
        } else if phase < day_start {
            dawn.lerp(day, smoothstep(dawn_peak, day_start, phase))
        } else if phase < day_end {
            day
        } else if phase < dusk_peak {
            day.lerp(dusk, smoothstep(day_end, dusk_peak, phase))
        } else if phase < night_start {
            dusk.lerp(night, smoothstep(dusk_peak, night_start, phase))
        } else {
            night
        }
    }

    /// Sky colour; exactly `biome_sky` across the noon plateau
    pub fn sky_color(&self, phase: f32, biome_sky: Rgb) -> Rgb {
        let p = &self.params;
        self.band_color(phase, p.night_color, p.dawn_color, biome_sky, p.dusk_color)
    }

    /// Fog colour, following the same bands as the sky
    pub fn fog_color(&self, phase: f32, biome_fog: Rgb) -> Rgb {
        let p = &self.params;
        self.band_color(phase, p.night_color, p.dawn_color, biome_fog, p.dusk_color)
    }

    /// Directional light colour: moonlight at night, warm accents at the edges
    pub fn light_color(&self, phase: f32) -> Rgb {
        let p = &self.params;
        self.band_color(
            phase,
            p.moonlight_color,
            p.dawn_color,
            p.sunlight_color,
            p.dusk_color,
        )
    }

    /// Light position on its circular path: `(cos a, sin a, cos a * k) * radius`
    /// with `a = (phase - 0.25) * 2π`, so sunrise sits at phase 0.25
    pub fn sun_position(&self, phase: f32) -> Vec3 {
        let angle = (phase - 0.25) * 2.0 * PI;
        Vec3::new(
            angle.cos(),
            angle.sin(),
            angle.cos() * self.params.sun_depth_factor,
        ) * self.params.sun_orbit_radius_m
    }

    pub fn sun_direction(&self, phase: f32) -> Vec3 {
        self.sun_position(phase).normalize()
    }

    /// Vertical component of the unscaled sun path; positive while above the horizon
    pub fn sun_elevation(&self, phase: f32) -> f32 {
        ((phase - 0.25) * 2.0 * PI).sin()
    }

    /// Moonlight floor plus a sun contribution while the sun is up
    pub fn light_intensity(&self, phase: f32) -> f32 {
        let p = &self.params;
        let elevation = self.sun_elevation(phase);
        if elevation <= 0.0 {
            return p.moonlight_intensity;
        }
        let horizon = smoothstep(0.0, p.horizon_fade, elevation);
        p.moonlight_intensity + p.sun_peak_intensity * light_response(dayness(phase)) * horizon
    }

    pub fn ambient_intensity(&self, phase: f32) -> f32 {
        lerp(self.params.ambient_night, self.params.ambient_day, dayness(phase))
    }

    pub fn fog_density(&self, phase: f32) -> f32 {
        let response = fog_response(dayness(phase));
        lerp(self.params.fog_density_night, self.params.fog_density_day, response)
    }

    /// Linear fog (near, far) distances
    pub fn fog_distances(&self, phase: f32) -> (f32, f32) {
        let p = &self.params;
        let response = fog_response(dayness(phase));
        (
            lerp(p.fog_near_night_m, p.fog_near_day_m, response),
            lerp(p.fog_far_night_m, p.fog_far_day_m, response),
        )
    }

    /// Full lighting state for one phase and palette
    pub fn sample(&self, phase: f32, palette: &Palette) -> ColorSample {
        let (fog_near, fog_far) = self.fog_distances(phase);
        ColorSample {
            sky: self.sky_color(phase, palette.sky),
            fog: self.fog_color(phase, palette.fog),
            fog_density: self.fog_density(phase),
            fog_near,
            fog_far,
            light_color: self.light_color(phase),
            light_intensity: self.light_intensity(phase),
            ambient_intensity: self.ambient_intensity(phase),
            light_direction: self.sun_direction(phase),
        }
    }
}

impl Default for CycleColorModel {
    fn default() -> Self {
        Self::new(CycleParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeCatalog;

    const EPS: f32 = 1e-3;

    fn golden_echo() -> Rgb {
        Rgb::from_u8(255, 209, 0)
    }

    #[test]
    fn test_noon_plateau_is_exact() {
        let model = CycleColorModel::default();
        assert_eq!(model.sky_color(0.5, golden_echo()), golden_echo());
        assert_eq!(model.sky_color(0.45, golden_echo()), golden_echo());
    }

    #[test]
    fn test_midnight_wraps() {
        let model = CycleColorModel::default();
        for biome in BiomeCatalog::builtin().iter() {
            let sky = biome.palette.sky;
            assert_eq!(model.sky_color(0.0, sky), model.sky_color(1.0, sky));
            assert_eq!(
                model.sky_color(wrap_phase(1.0), sky),
                model.sky_color(0.0, sky)
            );
        }
    }

    #[test]
    fn test_sky_continuous_at_band_edges() {
        let model = CycleColorModel::default();
        let breakpoints = model.params().breakpoints;
        for biome in BiomeCatalog::builtin().iter() {
            for b in breakpoints {
                let below = model.sky_color(b - 1e-4, biome.palette.sky);
                let above = model.sky_color(b + 1e-4, biome.palette.sky);
                assert!(
                    below.max_delta(above) < EPS,
                    "{}: jump {} at {}",
                    biome.name,
                    below.max_delta(above),
                    b
                );
            }
        }
    }

    #[test]
    fn test_accent_colors_reached() {
        let model = CycleColorModel::default();
        let p = model.params().clone();
        assert_eq!(model.sky_color(0.1, golden_echo()), p.night_color);
        assert!(model.sky_color(0.3, golden_echo()).max_delta(p.dawn_color) < 1e-6);
        assert!(model.sky_color(0.7, golden_echo()).max_delta(p.dusk_color) < 1e-6);
        assert_eq!(model.sky_color(0.9, golden_echo()), p.night_color);
    }

    #[test]
    fn test_dayness_curve() {
        assert_eq!(dayness(0.0), 0.0);
        assert_eq!(dayness(1.0), 0.0);
        assert!((dayness(0.5) - 1.0).abs() < 1e-6);
        for i in 0..=50 {
            let p = i as f32 / 100.0;
            assert!((dayness(p) - dayness(1.0 - p)).abs() < 1e-5);
            assert!((0.0..=1.0).contains(&dayness(p)));
        }
        assert_eq!(fog_response(0.5), 0.25);
        assert!((light_response(0.25) - 0.5).abs() < 1e-6);
        assert_eq!(star_opacity(1.0), 0.0);
    }

    #[test]
    fn test_wrap_phase() {
        assert_eq!(wrap_phase(1.25), 0.25);
        assert!((wrap_phase(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(wrap_phase(1.0), 0.0);
        assert_eq!(wrap_phase(f32::NAN), 0.0);
        assert!(wrap_phase(-1e-9) < 1.0);
    }

    #[test]
    fn test_sunrise_alignment() {
        let model = CycleColorModel::default();
        let sunrise = model.sun_position(0.25);
        assert!(sunrise.y.abs() < 1e-6);
        assert!((sunrise.x - model.params().sun_orbit_radius_m).abs() < 1e-4);

        let noon = model.sun_direction(0.5);
        assert!((noon.y - 1.0).abs() < 1e-5);

        let sunset = model.sun_position(0.75);
        assert!(sunset.y.abs() < 1e-4);
        assert!(sunset.x < 0.0);
    }

    #[test]
    fn test_light_intensity_floor_and_peak() {
        let model = CycleColorModel::default();
        let p = model.params().clone();
        assert_eq!(model.light_intensity(0.0), p.moonlight_intensity);
        assert_eq!(model.light_intensity(0.1), p.moonlight_intensity);
        assert_eq!(model.light_intensity(0.25), p.moonlight_intensity);
        let noon = model.light_intensity(0.5);
        assert!((noon - (p.moonlight_intensity + p.sun_peak_intensity)).abs() < 1e-4);
        // No jump as the sun clears the horizon
        let just_after = model.light_intensity(0.2501);
        assert!((just_after - p.moonlight_intensity).abs() < 0.05);
    }

    #[test]
    fn test_fog_tracks_dayness() {
        let model = CycleColorModel::default();
        let p = model.params().clone();
        assert_eq!(model.fog_distances(0.0), (p.fog_near_night_m, p.fog_far_night_m));
        let (near, far) = model.fog_distances(0.5);
        assert!((near - p.fog_near_day_m).abs() < 1e-4);
        assert!((far - p.fog_far_day_m).abs() < 1e-4);
        assert!(model.fog_density(0.0) > model.fog_density(0.5));
    }

    #[test]
    fn test_sample_uses_palette() {
        let model = CycleColorModel::default();
        let palette = BiomeCatalog::builtin().get(3).unwrap().palette;
        let sample = model.sample(0.5, &palette);
        assert_eq!(sample.sky, palette.sky);
        assert_eq!(sample.fog, palette.fog);
        assert!((sample.light_direction.length() - 1.0).abs() < 1e-5);
    }
}
