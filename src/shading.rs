//! Surface shading pipeline: uniform values and noise texture for the terrain
//! fragment stage.
//!
//! The per-fragment formulas live in `terrain.wgsl`. The functions at the
//! bottom of this module are their CPU counterparts and must stay in step
//! with the shader.

use std::f32::consts::TAU;
use std::path::Path;

use glam::Vec3;
use image::{ImageResult, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::biome::Palette;
use crate::color::Rgb;
use crate::math::{lerp, relax_factor, smoothstep};
use crate::noise::NoiseField;
use crate::params::{RippleLayer, ShadingParams};

/// Axis the view direction is projected on for the sparkle flicker
pub const SPARKLE_AXIS: [f32; 3] = [12.9898, 78.233, 37.719];

/// Frequency of the sparkle flicker along [`SPARKLE_AXIS`]
pub const SPARKLE_VIEW_FREQUENCY: f32 = 0.6;

/// Uniform values consumed by the terrain fragment stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderUniformSet {
    /// Colour of troughs and low bands
    pub color_low: Rgb,
    /// Colour of crests and high bands
    pub color_high: Rgb,
    /// Mid-tone ground colour
    pub color_base: Rgb,
    /// Biome surface roughness in [0, 1]
    pub roughness: f32,
    /// Shading clock; only ever increases
    pub time: f32,
}

/// Noise frequency (1/meters) and slice offset per texture channel: R, G, B
const CHANNELS: [(f32, f32); 3] = [(0.2, 0.0), (2.4, 17.0), (0.8, -31.0)];

/// Fraction of texels clipped at each end when a channel is contrast-stretched
const STRETCH_TAIL: f32 = 0.02;

/// Baked RGBA noise texture, tileable over `span_m` meters.
///
/// R: broad dune noise used for banding. G: fine grain used for sparkle.
/// B: mid-frequency variation for roughness. Each channel is stretched so its
/// 2nd..98th percentile spans the full [0, 1] range.
pub struct NoiseTexture {
    image: RgbaImage,
    span_m: f32,
}

impl NoiseTexture {
    /// Bake from the shared noise field
    pub fn bake(noise: &NoiseField, size: u32, span_m: f32) -> Self {
        let side = size as usize;
        let channels: Vec<Vec<u8>> = CHANNELS
            .iter()
            .map(|&(frequency, offset)| {
                // One repeat of the tile walks span_m * frequency noise units
                let radius = span_m * frequency / TAU;
                let raw: Vec<f32> = (0..side * side)
                    .into_par_iter()
                    .map(|i| {
                        let u = (i % side) as f32 / size as f32;
                        let v = (i / side) as f32 / size as f32;
                        noise.sample_torus(u, v, radius, offset)
                    })
                    .collect();
                contrast_stretch(&raw)
            })
            .collect();

        let image = RgbaImage::from_fn(size, size, |px, py| {
            let i = py as usize * side + px as usize;
            Rgba([channels[0][i], channels[1][i], channels[2][i], 255])
        });

        log::info!("Baked {}x{} shading noise texture", size, size);
        Self { image, span_m }
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// World meters covered by one repeat
    pub fn span_m(&self) -> f32 {
        self.span_m
    }

    /// Raw RGBA8 texels, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Channel values at world (x, z), nearest texel, each in [0, 1]
    pub fn sample(&self, x: f32, z: f32) -> [f32; 4] {
        let size = self.size();
        let wrap = |v: f32| {
            let t = (v / self.span_m).rem_euclid(1.0);
            ((t * size as f32) as u32).min(size - 1)
        };
        let texel = self.image.get_pixel(wrap(x), wrap(z));
        texel.0.map(|c| c as f32 / 255.0)
    }

    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        self.image.save(path)
    }
}

/// Map the percentile window `[STRETCH_TAIL, 1 - STRETCH_TAIL]` of `values`
/// onto 0..=255, clamping the tails
fn contrast_stretch(values: &[f32]) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f32::total_cmp);
    let last = sorted.len() - 1;
    let lo = sorted[(last as f32 * STRETCH_TAIL) as usize];
    let hi = sorted[(last as f32 * (1.0 - STRETCH_TAIL)) as usize];
    let range = (hi - lo).max(1e-6);
    values
        .iter()
        .map(|&v| (((v - lo) / range).clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

/// Owns the terrain shading uniforms and advances them each frame
pub struct SurfaceShadingPipeline {
    params: ShadingParams,
    uniforms: ShaderUniformSet,
    target_palette: Palette,
    target_roughness: f32,
    texture: NoiseTexture,
}

impl SurfaceShadingPipeline {
    /// Start with the palette already in place
    pub fn new(params: ShadingParams, noise: &NoiseField, palette: &Palette, roughness: f32) -> Self {
        let texture = NoiseTexture::bake(noise, params.noise_texture_size, params.noise_texture_span_m);
        Self {
            uniforms: ShaderUniformSet {
                color_low: palette.ground_low,
                color_high: palette.ground_high,
                color_base: palette.ground,
                roughness,
                time: 0.0,
            },
            params,
            target_palette: *palette,
            target_roughness: roughness,
            texture,
        }
    }

    /// Set the palette the uniforms relax toward
    pub fn set_target_palette(&mut self, palette: &Palette, roughness: f32) {
        self.target_palette = *palette;
        self.target_roughness = roughness;
    }

    /// Advance the clock and relax colours toward the target palette
    pub fn update(&mut self, delta_s: f32) {
        if !(delta_s > 0.0) {
            return;
        }
        self.uniforms.time += delta_s * self.params.time_scale;

        let t = relax_factor(self.params.color_rate_per_s, delta_s);
        let u = &mut self.uniforms;
        u.color_low = u.color_low.lerp(self.target_palette.ground_low, t);
        u.color_high = u.color_high.lerp(self.target_palette.ground_high, t);
        u.color_base = u.color_base.lerp(self.target_palette.ground, t);
        u.roughness = lerp(u.roughness, self.target_roughness, t);
    }

    pub fn uniforms(&self) -> &ShaderUniformSet {
        &self.uniforms
    }

    pub fn params(&self) -> &ShadingParams {
        &self.params
    }

    pub fn noise_texture(&self) -> &NoiseTexture {
        &self.texture
    }
}

fn ripple_phase(layer: &RippleLayer, x: f32, z: f32, time: f32) -> (f32, [f32; 2]) {
    let [dx, dz] = layer.direction;
    let len = (dx * dx + dz * dz).sqrt().max(1e-6);
    let dir = [dx / len, dz / len];
    ((x * dir[0] + z * dir[1]) * layer.frequency + time * layer.speed, dir)
}

/// Sum of the two sine ripple layers at (x, z)
pub fn ripple(params: &ShadingParams, x: f32, z: f32, time: f32) -> f32 {
    [params.primary_ripple, params.secondary_ripple]
        .iter()
        .map(|layer| ripple_phase(layer, x, z, time).0.sin() * layer.amplitude)
        .sum()
}

/// Analytic (d/dx, d/dz) of [`ripple`], used to bend normals along dune contours
pub fn ripple_gradient(params: &ShadingParams, x: f32, z: f32, time: f32) -> [f32; 2] {
    [params.primary_ripple, params.secondary_ripple]
        .iter()
        .fold([0.0, 0.0], |acc, layer| {
            let (phase, dir) = ripple_phase(layer, x, z, time);
            let slope = phase.cos() * layer.amplitude * layer.frequency;
            [acc[0] + slope * dir[0], acc[1] + slope * dir[1]]
        })
}

/// Normal perturbed by the ripple slope
pub fn bump_normal(params: &ShadingParams, normal: Vec3, x: f32, z: f32, time: f32) -> Vec3 {
    let [gx, gz] = ripple_gradient(params, x, z, time);
    (normal - Vec3::new(gx, 0.0, gz) * params.bump_strength).normalize()
}

/// Palette interpolation parameter from height band, broad noise and ripple
pub fn band_position(params: &ShadingParams, height_band: f32, noise_low: f32, ripple: f32) -> f32 {
    let w = params.band_noise_weight;
    (height_band * (1.0 - w) + noise_low * w + ripple).clamp(0.0, 1.0)
}

/// Brightness multiplier from fine grain, stronger on rough biomes
pub fn grain_factor(grain: f32, roughness: f32) -> f32 {
    1.0 + (grain - 0.5) * 0.2 * roughness
}

/// View and time dependent flicker in [0, 1] that gates the sparkle
pub fn sparkle_flicker(view_dir: Vec3, time: f32) -> f32 {
    let axis = Vec3::from_array(SPARKLE_AXIS);
    0.5 + 0.5 * (view_dir.dot(axis) * SPARKLE_VIEW_FREQUENCY + time * TAU).sin()
}

/// View-dependent glint: thresholded fine noise modulated by the view direction
pub fn sparkle(params: &ShadingParams, noise_high: f32, view_dir: Vec3, time: f32) -> f32 {
    let [lo, hi] = params.sparkle_threshold;
    smoothstep(lo, hi, noise_high * sparkle_flicker(view_dir, time))
}

/// Biome roughness varied by the texture's B channel, in [0.8, 1.2] times the base
pub fn textured_roughness(roughness: f32, variation: f32) -> f32 {
    roughness * (0.8 + 0.4 * variation)
}

/// Roughness after ripple and sparkle modulation
pub fn roughness_factor(base_roughness: f32, ripple: f32, sparkle: f32) -> f32 {
    (0.75 + 0.25 * base_roughness - ripple * 0.5 - sparkle * 0.6).clamp(0.05, 1.0)
}

/// Metalness contributed by sparkle
pub fn metalness_factor(sparkle: f32) -> f32 {
    sparkle * 0.35
}

/// Final albedo for one fragment
pub fn surface_color(uniforms: &ShaderUniformSet, band: f32, grain: f32) -> Rgb {
    let base = uniforms.color_low.lerp(uniforms.color_high, band);
    let g = grain_factor(grain, uniforms.roughness);
    Rgb::new(base.r * g, base.g * g, base.b * g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeCatalog;

    fn pipeline(index: usize) -> SurfaceShadingPipeline {
        let biome = BiomeCatalog::builtin().get(index).unwrap().clone();
        let params = ShadingParams {
            noise_texture_size: 32,
            ..Default::default()
        };
        SurfaceShadingPipeline::new(params, &NoiseField::new(9), &biome.palette, biome.roughness)
    }

    #[test]
    fn test_time_is_monotonic() {
        let mut shading = pipeline(0);
        let mut last = shading.uniforms().time;
        for dt in [0.016, 0.0, -1.0, f32::NAN, 0.5, 0.016] {
            shading.update(dt);
            assert!(shading.uniforms().time >= last);
            last = shading.uniforms().time;
        }
        assert!((last - (0.532 * 0.15)).abs() < 1e-5);
    }

    #[test]
    fn test_palette_relaxes_without_snapping() {
        let catalog = BiomeCatalog::builtin();
        let mut shading = pipeline(0);
        let target = catalog.get(1).unwrap();
        shading.set_target_palette(&target.palette, target.roughness);

        shading.update(0.016);
        let first = shading.uniforms().color_low;
        assert_ne!(first, target.palette.ground_low);
        assert!(first.max_delta(target.palette.ground_low) > 0.0);

        for _ in 0..600 {
            shading.update(0.016);
        }
        assert!(shading.uniforms().color_low.max_delta(target.palette.ground_low) < 1e-3);
        assert!((shading.uniforms().roughness - target.roughness).abs() < 1e-3);
    }

    #[test]
    fn test_noise_texture_is_deterministic() {
        let a = pipeline(0);
        let b = pipeline(3);
        assert_eq!(a.noise_texture().as_bytes(), b.noise_texture().as_bytes());
        assert_eq!(a.noise_texture().as_bytes().len(), 32 * 32 * 4);
    }

    #[test]
    fn test_noise_texture_sample_wraps() {
        let shading = pipeline(0);
        let tex = shading.noise_texture();
        let span = tex.span_m();
        assert_eq!(tex.sample(3.0, 4.0), tex.sample(3.0 + span, 4.0 - span));
        assert!(tex.sample(1.0, 2.0).iter().all(|c| (0.0..=1.0).contains(c)));
    }

    /// Green channel of the default-size texture, as shader-side values
    fn default_grain_channel() -> (u32, Vec<f32>) {
        let params = ShadingParams::default();
        let tex = NoiseTexture::bake(
            &NoiseField::new(9),
            params.noise_texture_size,
            params.noise_texture_span_m,
        );
        let grain = tex
            .as_bytes()
            .chunks_exact(4)
            .map(|texel| texel[1] as f32 / 255.0)
            .collect();
        (tex.size(), grain)
    }

    fn variance(values: &[f32]) -> f32 {
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
    }

    #[test]
    fn test_noise_texture_is_continuous_across_seam() {
        let (size, grain) = default_grain_channel();
        let side = size as usize;
        let at = |x: usize, y: usize| grain[y * side + x];
        // Steps across the seam look like steps inside the tile
        let seam: f32 = (0..side).map(|y| (at(side - 1, y) - at(0, y)).abs()).sum();
        let inner: f32 = (0..side).map(|y| (at(side / 2, y) - at(side / 2 + 1, y)).abs()).sum();
        assert!(seam < inner * 2.0 + 1.0, "seam {} vs inner {}", seam, inner);
    }

    #[test]
    fn test_noise_texture_uses_full_range() {
        let (_, grain) = default_grain_channel();
        let max = grain.iter().cloned().fold(0.0, f32::max);
        let min = grain.iter().cloned().fold(1.0, f32::min);
        assert_eq!(max, 1.0);
        assert_eq!(min, 0.0);
    }

    #[test]
    fn test_noise_texture_variance_is_uniform() {
        let (size, grain) = default_grain_channel();
        let side = size as usize;
        let quarter = side / 4;
        let block = |x0: usize, y0: usize, w: usize| -> Vec<f32> {
            (y0..y0 + w)
                .flat_map(|y| (x0..x0 + w).map(move |x| (x, y)))
                .map(|(x, y)| grain[y * side + x])
                .collect()
        };

        // The four corner blocks meet at the tile seam
        let half = quarter / 2;
        let mut corners = Vec::new();
        for (x0, y0) in [(0, 0), (side - half, 0), (0, side - half), (side - half, side - half)] {
            corners.extend(block(x0, y0, half));
        }
        let centre = block(side / 2 - half, side / 2 - half, quarter);
        assert_eq!(corners.len(), centre.len());

        let ratio = variance(&centre) / variance(&corners);
        assert!((0.6..1.6).contains(&ratio), "centre/corner variance {}", ratio);
    }

    #[test]
    fn test_texture_grain_produces_sparkle() {
        let params = ShadingParams::default();
        let (_, grain) = default_grain_channel();
        let view = Vec3::Y;
        let phase = view.dot(Vec3::from_array(SPARKLE_AXIS)) * SPARKLE_VIEW_FREQUENCY;
        let time = ((std::f32::consts::FRAC_PI_2 - phase) / TAU).rem_euclid(1.0);
        assert!(sparkle_flicker(view, time) > 0.999);

        let lit = grain
            .iter()
            .filter(|&&g| sparkle(&params, g, view, time) > 0.5)
            .count();
        let share = lit as f32 / grain.len() as f32;
        assert!(share > 0.015 && share < 0.3, "sparkling share {}", share);
    }

    #[test]
    fn test_ripple_bounded() {
        let params = ShadingParams::default();
        let limit = params.primary_ripple.amplitude + params.secondary_ripple.amplitude;
        for i in 0..100 {
            let v = ripple(&params, i as f32 * 0.7, i as f32 * -0.3, i as f32 * 0.01);
            assert!(v.abs() <= limit + 1e-6);
        }
    }

    #[test]
    fn test_ripple_gradient_matches_finite_difference() {
        let params = ShadingParams::default();
        let (x, z, t) = (3.2, -1.7, 0.4);
        let h = 1e-3;
        let [gx, gz] = ripple_gradient(&params, x, z, t);
        let fx = (ripple(&params, x + h, z, t) - ripple(&params, x - h, z, t)) / (2.0 * h);
        let fz = (ripple(&params, x, z + h, t) - ripple(&params, x, z - h, t)) / (2.0 * h);
        assert!((gx - fx).abs() < 1e-2);
        assert!((gz - fz).abs() < 1e-2);
    }

    #[test]
    fn test_band_position_clamped() {
        let params = ShadingParams::default();
        assert_eq!(band_position(&params, 1.0, 1.0, 0.5), 1.0);
        assert_eq!(band_position(&params, 0.0, 0.0, -0.5), 0.0);
        let mid = band_position(&params, 0.5, 0.5, 0.0);
        assert!((mid - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sparkle_depends_on_view() {
        let params = ShadingParams::default();
        let (_, grain) = default_grain_channel();
        let brightest = grain.iter().cloned().fold(0.0, f32::max);
        let darkest = grain.iter().cloned().fold(1.0, f32::min);
        assert_eq!(sparkle(&params, darkest, Vec3::Y, 0.0), 0.0);

        let values: Vec<f32> = (0..64)
            .map(|i| {
                let angle = i as f32 * 0.05;
                let view = Vec3::new(angle.cos(), -0.5, angle.sin()).normalize();
                sparkle(&params, brightest, view, 0.0)
            })
            .collect();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(values.iter().any(|&v| v > 0.5));
        assert!(values.iter().any(|&v| v < 0.1));
    }

    #[test]
    fn test_textured_roughness_scales_base() {
        assert!((textured_roughness(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert!((textured_roughness(0.5, 0.0) - 0.4).abs() < 1e-6);
        assert!((textured_roughness(0.5, 1.0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_sparkle_makes_surface_smoother() {
        assert!(roughness_factor(0.5, 0.0, 1.0) < roughness_factor(0.5, 0.0, 0.0));
        assert_eq!(metalness_factor(0.0), 0.0);
    }

    #[test]
    fn test_bump_normal_stays_upward() {
        let params = ShadingParams::default();
        for i in 0..32 {
            let n = bump_normal(&params, Vec3::Y, i as f32 * 0.4, 1.0, 0.0);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.5);
        }
    }

    #[test]
    fn test_surface_color_endpoints() {
        let shading = pipeline(2);
        let u = *shading.uniforms();
        let low = surface_color(&u, 0.0, 0.5);
        assert!(low.max_delta(u.color_low) < 1e-6);
        let high = surface_color(&u, 1.0, 0.5);
        assert!(high.max_delta(u.color_high) < 1e-6);
    }
}
