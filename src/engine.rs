//! Frame driver tying terrain, atmosphere and shading together.

use crate::atmosphere::{AtmosphereController, ColorSample, CycleColorModel};
use crate::biome::{BiomeCatalog, BiomeParams};
use crate::noise::NoiseField;
use crate::params::{CycleParams, ShadingParams, TerrainParams};
use crate::shading::{ShaderUniformSet, SurfaceShadingPipeline};
use crate::state::SceneState;
use crate::terrain::{RelaxState, TerrainSystem};

/// What one frame produced for the rendering backend
#[derive(Debug, Clone, Copy)]
pub struct FrameOutput {
    pub color: ColorSample,
    pub uniforms: ShaderUniformSet,
    pub dayness: f32,
    /// Heights changed this frame and the vertex buffer needs re-uploading
    pub terrain_changed: bool,
    pub normals_recomputed: bool,
}

/// Owns every core system and runs them once per frame
pub struct DesertEngine {
    catalog: BiomeCatalog,
    applied_biome: usize,
    pub terrain: TerrainSystem,
    pub atmosphere: AtmosphereController,
    pub shading: SurfaceShadingPipeline,
}

impl DesertEngine {
    pub fn new(
        catalog: BiomeCatalog,
        state: &SceneState,
        noise: NoiseField,
        terrain_params: &TerrainParams,
        cycle_params: CycleParams,
        shading_params: ShadingParams,
    ) -> Self {
        let applied_biome = state.biome_index() % catalog.len();
        let biome = catalog.get_wrapped(applied_biome as isize).clone();
        Self {
            terrain: TerrainSystem::new(terrain_params, noise, &biome),
            atmosphere: AtmosphereController::new(CycleColorModel::new(cycle_params)),
            shading: SurfaceShadingPipeline::new(shading_params, &noise, &biome.palette, biome.roughness),
            catalog,
            applied_biome,
        }
    }

    pub fn catalog(&self) -> &BiomeCatalog {
        &self.catalog
    }

    pub fn active_biome(&self) -> &BiomeParams {
        self.catalog.get_wrapped(self.applied_biome as isize)
    }

    /// Run one frame against the host's current state
    pub fn frame(&mut self, state: &SceneState, delta_s: f32) -> FrameOutput {
        let wanted = state.biome_index() % self.catalog.len();
        if wanted != self.applied_biome {
            self.applied_biome = wanted;
            let biome = self.catalog.get_wrapped(wanted as isize).clone();
            self.terrain.set_biome(&biome);
        }

        let was_relaxing = self.terrain.state() == RelaxState::Relaxing;
        let normals_recomputed = self.terrain.update(delta_s);
        // A background target may have been installed and ticked this frame
        let terrain_changed =
            delta_s > 0.0 && (was_relaxing || self.terrain.state() == RelaxState::Relaxing);

        let biome = self.catalog.get_wrapped(self.applied_biome as isize);
        let color = *self
            .atmosphere
            .update(state.phase(), biome, delta_s, &mut self.shading);
        self.shading.update(delta_s);

        FrameOutput {
            color,
            uniforms: *self.shading.uniforms(),
            dayness: self.atmosphere.dayness(),
            terrain_changed,
            normals_recomputed,
        }
    }
}
