//! Height synthesis: fractal Brownian motion with a radial edge skirt.

use rayon::prelude::*;

use super::grid::GridLayout;
use crate::biome::BiomeParams;
use crate::math::{lerp, smoothstep};
use crate::noise::NoiseField;
use crate::params::TerrainParams;

/// Turns (x, z, biome) into an elevation
#[derive(Debug, Clone, Copy)]
pub struct HeightSynthesizer {
    noise: NoiseField,
    octaves: u32,
    persistence: f32,
    lacunarity: f32,
    height_gain: f32,
    base_wavelength_m: f32,
    falloff_inner_m: f32,
    falloff_outer_m: f32,
    skirt_elevation_m: f32,
}

impl HeightSynthesizer {
    pub fn new(noise: NoiseField, params: &TerrainParams) -> Self {
        Self {
            noise,
            octaves: params.octaves,
            persistence: params.persistence,
            lacunarity: params.lacunarity,
            height_gain: params.height_gain,
            base_wavelength_m: params.base_wavelength_m,
            falloff_inner_m: params.falloff_inner_m,
            falloff_outer_m: params.falloff_outer_m,
            skirt_elevation_m: params.skirt_elevation_m,
        }
    }

    pub fn skirt_elevation(&self) -> f32 {
        self.skirt_elevation_m
    }

    /// Raw fractal sum before the skirt is applied.
    ///
    /// Zero height or frequency scale yields a flat field.
    pub fn fractal_sum(&self, x: f32, z: f32, biome: &BiomeParams) -> f32 {
        if !(biome.base_height_scale > 0.0) || !(biome.base_frequency_scale > 0.0) {
            return 0.0;
        }

        let mut amplitude = biome.base_height_scale * self.height_gain;
        let mut frequency = 1.0 / (self.base_wavelength_m * biome.base_frequency_scale);
        let mut total = 0.0;

        for _ in 0..self.octaves {
            total += self.noise.sample(x * frequency, z * frequency) * amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }

        total
    }

    /// Blend `height` toward the skirt elevation by planar distance from the origin
    pub fn apply_falloff(&self, x: f32, z: f32, height: f32) -> f32 {
        let dist = (x * x + z * z).sqrt();
        if dist <= self.falloff_inner_m {
            height
        } else if dist >= self.falloff_outer_m {
            self.skirt_elevation_m
        } else {
            let t = smoothstep(self.falloff_inner_m, self.falloff_outer_m, dist);
            lerp(height, self.skirt_elevation_m, t)
        }
    }

    /// Elevation at (x, z) for a biome
    pub fn synthesize(&self, x: f32, z: f32, biome: &BiomeParams) -> f32 {
        self.apply_falloff(x, z, self.fractal_sum(x, z, biome))
    }

    /// Full target field for every vertex of `grid`
    pub fn synthesize_field(&self, grid: &GridLayout, biome: &BiomeParams) -> Vec<f32> {
        (0..grid.vertex_count())
            .into_par_iter()
            .map(|i| {
                let (x, z) = grid.position(i);
                self.synthesize(x, z, biome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeCatalog;

    fn synth() -> HeightSynthesizer {
        HeightSynthesizer::new(NoiseField::new(1234), &TerrainParams::default())
    }

    fn first_biome() -> BiomeParams {
        BiomeCatalog::builtin().get(0).unwrap().clone()
    }

    #[test]
    fn test_origin_is_raw_fractal_sum() {
        let s = synth();
        let biome = first_biome();
        assert_eq!(biome.base_height_scale, 2.0);
        assert_eq!(biome.base_frequency_scale, 4.0);

        let raw = s.fractal_sum(0.0, 0.0, &biome);
        assert_eq!(s.synthesize(0.0, 0.0, &biome).to_bits(), raw.to_bits());

        // Any point inside the inner radius is untouched
        let raw_inner = s.fractal_sum(12.5, -30.0, &biome);
        assert_eq!(s.synthesize(12.5, -30.0, &biome), raw_inner);
    }

    #[test]
    fn test_partial_skirt_blend() {
        let s = synth();
        let biome = first_biome();
        let raw = s.fractal_sum(44.0, 0.0, &biome);
        let blended = s.synthesize(44.0, 0.0, &biome);
        let (lo, hi) = if raw < -20.0 { (raw, -20.0) } else { (-20.0, raw) };
        assert!(blended > lo && blended < hi, "{} not in ({}, {})", blended, lo, hi);
    }

    #[test]
    fn test_outside_skirt_is_exact() {
        let s = synth();
        let biome = first_biome();
        assert_eq!(s.synthesize(60.0, 0.0, &biome), -20.0);
        assert_eq!(s.synthesize(48.0, 0.0, &biome), -20.0);
        for i in 0..64 {
            let angle = i as f32 * 0.098;
            let r = 48.0 + i as f32 * 0.5;
            assert_eq!(s.synthesize(r * angle.cos(), r * angle.sin(), &biome), -20.0);
        }
    }

    #[test]
    fn test_continuous_across_falloff_edges() {
        let s = synth();
        for biome in BiomeCatalog::builtin().iter() {
            for radius in [40.0_f32, 48.0] {
                for i in 0..16 {
                    let angle = i as f32 * 0.39;
                    let (c, sn) = (angle.cos(), angle.sin());
                    let inside = s.synthesize((radius - 1e-3) * c, (radius - 1e-3) * sn, biome);
                    let outside = s.synthesize((radius + 1e-3) * c, (radius + 1e-3) * sn, biome);
                    assert!(
                        (inside - outside).abs() < 1e-2,
                        "{}: jump of {} at r={}",
                        biome.name,
                        (inside - outside).abs(),
                        radius
                    );
                }
            }
        }
    }

    #[test]
    fn test_degenerate_scale_is_flat() {
        let s = synth();
        let mut biome = first_biome();
        biome.base_frequency_scale = 0.0;
        assert_eq!(s.synthesize(3.0, 4.0, &biome), 0.0);
        biome.base_frequency_scale = 4.0;
        biome.base_height_scale = 0.0;
        assert_eq!(s.synthesize(3.0, 4.0, &biome), 0.0);
    }

    #[test]
    fn test_field_matches_pointwise() {
        let s = synth();
        let biome = first_biome();
        let grid = GridLayout::new(8, 100.0);
        let field = s.synthesize_field(&grid, &biome);
        assert_eq!(field.len(), grid.vertex_count());
        for (i, h) in field.iter().enumerate() {
            let (x, z) = grid.position(i);
            assert_eq!(*h, s.synthesize(x, z, &biome));
        }
    }
}
