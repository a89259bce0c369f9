//! Surface shading parameters: dune ripples, grain and sparkle.

use crate::error::ParamsError;

/// One additive sine ripple layer: `sin(dot(xz, direction) * frequency + time * speed) * amplitude`
#[derive(Debug, Clone, Copy)]
pub struct RippleLayer {
    /// Wave travel direction in the XZ plane (normalised by the shader)
    pub direction: [f32; 2],

    /// Spatial frequency (radians per meter)
    pub frequency: f32,

    /// Phase advance per unit of shading clock (radians)
    pub speed: f32,

    /// Contribution to the band parameter
    pub amplitude: f32,
}

/// Surface shading parameters
#[derive(Debug, Clone)]
pub struct ShadingParams {
    /// Shading clock advance per real second
    pub time_scale: f32,

    /// Rate at which palette endpoints chase the biome palette (1/seconds)
    pub color_rate_per_s: f32,

    /// Broad ripple layer following the prevailing wind
    pub primary_ripple: RippleLayer,

    /// Finer cross ripple layer
    pub secondary_ripple: RippleLayer,

    /// Weight of the baked low-frequency noise in the band parameter
    pub band_noise_weight: f32,

    /// Sparkle threshold window (smoothstep edges)
    pub sparkle_threshold: [f32; 2],

    /// Strength of the ripple bump applied to normals
    pub bump_strength: f32,

    /// Baked noise texture resolution (texels per side)
    pub noise_texture_size: u32,

    /// World-space meters covered by one repeat of the noise texture
    pub noise_texture_span_m: f32,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            time_scale: 0.15,
            color_rate_per_s: 2.0,
            primary_ripple: RippleLayer {
                direction: [0.8, 0.6],
                frequency: 3.1,
                speed: 6.0,
                amplitude: 0.12,
            },
            secondary_ripple: RippleLayer {
                direction: [-0.35, 0.94],
                frequency: 7.3,
                speed: 9.5,
                amplitude: 0.05,
            },
            band_noise_weight: 0.35,
            sparkle_threshold: [0.72, 0.95],
            bump_strength: 0.35,
            noise_texture_size: 256,
            noise_texture_span_m: 25.0,
        }
    }
}

impl ShadingParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.noise_texture_size == 0 {
            return Err(ParamsError::EmptyNoiseTexture);
        }
        for (name, value) in [
            ("time_scale", self.time_scale),
            ("color_rate_per_s", self.color_rate_per_s),
            ("noise_texture_span_m", self.noise_texture_span_m),
        ] {
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}
