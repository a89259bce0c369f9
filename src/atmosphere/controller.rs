//! Per-frame atmosphere orchestration.

use super::cycle::{self, ColorSample, CycleColorModel};
use crate::biome::BiomeParams;
use crate::math::relax_factor;
use crate::shading::SurfaceShadingPipeline;

/// Reads phase and biome each frame, derives lighting, and pushes the biome
/// palette into the shading pipeline.
///
/// Colours in the published sample chase the freshly derived target instead
/// of snapping, so biome switches and phase jumps never pop. Scalar terms
/// (intensities, fog distances) are continuous in phase and published as-is.
pub struct AtmosphereController {
    model: CycleColorModel,
    sample: Option<ColorSample>,
    phase: f32,
    dayness: f32,
}

impl AtmosphereController {
    pub fn new(model: CycleColorModel) -> Self {
        Self {
            model,
            sample: None,
            phase: 0.0,
            dayness: 0.0,
        }
    }

    /// Run one frame. Must be called every frame, even when terrain is idle.
    pub fn update(
        &mut self,
        phase: f32,
        biome: &BiomeParams,
        delta_s: f32,
        shading: &mut SurfaceShadingPipeline,
    ) -> &ColorSample {
        if !phase.is_finite() {
            log::warn!("Non-finite day/night phase {}, using midnight", phase);
        }
        self.phase = cycle::wrap_phase(phase);
        self.dayness = cycle::dayness(self.phase);

        let target = self.model.sample(self.phase, &biome.palette);
        let next = match self.sample {
            None => target,
            Some(current) => {
                let t = relax_factor(self.model.params().color_rate_per_s, delta_s);
                ColorSample {
                    sky: current.sky.lerp(target.sky, t),
                    fog: current.fog.lerp(target.fog, t),
                    light_color: current.light_color.lerp(target.light_color, t),
                    ..target
                }
            }
        };

        shading.set_target_palette(&biome.palette, biome.roughness);
        self.sample.insert(next)
    }

    /// Last published sample, if any frame has run
    pub fn sample(&self) -> Option<&ColorSample> {
        self.sample.as_ref()
    }

    /// Wrapped phase used by the last frame
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// `sin(phase * π)` for the last frame, shared with secondary effects
    pub fn dayness(&self) -> f32 {
        self.dayness
    }

    pub fn star_opacity(&self) -> f32 {
        cycle::star_opacity(self.dayness)
    }

    pub fn model(&self) -> &CycleColorModel {
        &self.model
    }
}
