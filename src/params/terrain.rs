//! Terrain grid, height synthesis and relaxation parameters.

use crate::error::ParamsError;

/// Terrain parameters (world units are meters)
#[derive(Debug, Clone)]
pub struct TerrainParams {
    /// Quads per side of the square grid (128 = 16,641 vertices)
    pub grid_segments: usize,

    /// Side length of the terrain plane (meters, centred on origin)
    pub plane_size_m: f32,

    /// Fractal octaves summed per sample
    pub octaves: u32,

    /// Amplitude decay per octave
    pub persistence: f32,

    /// Frequency multiplier per octave
    pub lacunarity: f32,

    /// First-octave amplitude = biome height scale * this gain
    pub height_gain: f32,

    /// First-octave wavelength = biome frequency scale * this (meters)
    pub base_wavelength_m: f32,

    /// Radius inside which terrain is untouched by the skirt (meters)
    pub falloff_inner_m: f32,

    /// Radius beyond which terrain is pinned to the skirt elevation (meters)
    pub falloff_outer_m: f32,

    /// Elevation of the flat skirt hiding the grid boundary (meters)
    pub skirt_elevation_m: f32,

    /// Relaxation rate toward the target field (1/seconds)
    /// 4.0 settles a 20m delta below 1cm in ~1.9s
    pub relax_rate_per_s: f32,

    /// Largest remaining per-vertex delta that counts as converged (meters)
    pub settle_epsilon_m: f32,

    /// Recompute normals every Nth frame while relaxing
    pub normal_interval_frames: u32,

    /// Grids with more vertices than this compute new targets on a worker thread
    pub background_vertex_threshold: usize,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            grid_segments: 128,
            plane_size_m: 100.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            height_gain: 1.2,
            base_wavelength_m: 10.0,
            falloff_inner_m: 40.0,
            falloff_outer_m: 48.0,
            skirt_elevation_m: -20.0,
            relax_rate_per_s: 4.0,
            settle_epsilon_m: 0.01,
            normal_interval_frames: 3,
            background_vertex_threshold: 65_536,
        }
    }
}

impl TerrainParams {
    /// Vertices in the grid: (segments + 1)^2
    pub fn vertex_count(&self) -> usize {
        (self.grid_segments + 1).pow(2)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.grid_segments == 0 {
            return Err(ParamsError::EmptyGrid);
        }
        for (name, value) in [
            ("plane_size_m", self.plane_size_m),
            ("base_wavelength_m", self.base_wavelength_m),
            ("relax_rate_per_s", self.relax_rate_per_s),
            ("settle_epsilon_m", self.settle_epsilon_m),
        ] {
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        if self.normal_interval_frames == 0 {
            return Err(ParamsError::NotPositive {
                name: "normal_interval_frames",
                value: 0.0,
            });
        }
        if !(self.falloff_inner_m < self.falloff_outer_m) {
            return Err(ParamsError::InvertedFalloff {
                inner: self.falloff_inner_m,
                outer: self.falloff_outer_m,
            });
        }
        Ok(())
    }
}
