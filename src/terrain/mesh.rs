//! Terrain mesh with current/target height buffers and per-frame relaxation.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rayon::prelude::*;

use super::grid::GridLayout;
use super::height::HeightSynthesizer;
use crate::biome::BiomeParams;
use crate::math::relax_factor;
use crate::params::TerrainParams;

/// Vertex data for the terrain mesh
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Normalised height within the biome's dune range, drives colour banding
    pub band: f32,
}

/// Relaxation state of the height field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxState {
    /// `current` equals `target`; nothing to do per frame
    Idle,
    /// `current` is converging toward a freshly computed `target`
    Relaxing,
}

/// Fixed-topology terrain grid holding displayed and target heights
pub struct TerrainMesh {
    grid: GridLayout,
    synthesizer: HeightSynthesizer,
    current: Vec<f32>,
    target: Vec<f32>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    state: RelaxState,
    relax_rate_per_s: f32,
    settle_epsilon_m: f32,
    normal_interval_frames: u32,
    falloff_inner_m: f32,
    frames_since_normals: u32,
    relax_elapsed_s: f32,
    band_range: (f32, f32),
}

impl TerrainMesh {
    /// Create a flat mesh that starts relaxing toward `biome`
    pub fn new(
        grid: GridLayout,
        synthesizer: HeightSynthesizer,
        params: &TerrainParams,
        biome: &BiomeParams,
    ) -> Self {
        let vertex_count = grid.vertex_count();
        let mut mesh = Self {
            grid,
            synthesizer,
            current: vec![0.0; vertex_count],
            target: vec![0.0; vertex_count],
            normals: vec![[0.0, 1.0, 0.0]; vertex_count],
            indices: grid.triangle_indices(),
            state: RelaxState::Idle,
            relax_rate_per_s: params.relax_rate_per_s,
            settle_epsilon_m: params.settle_epsilon_m,
            normal_interval_frames: params.normal_interval_frames.max(1),
            falloff_inner_m: params.falloff_inner_m,
            frames_since_normals: 0,
            relax_elapsed_s: 0.0,
            band_range: (0.0, 0.0),
        };
        mesh.on_biome_changed(biome);
        mesh
    }

    /// Recompute the full target field and start relaxing toward it
    pub fn on_biome_changed(&mut self, biome: &BiomeParams) {
        let target = self.synthesizer.synthesize_field(&self.grid, biome);
        self.install_target(target);
    }

    /// Swap in a complete target buffer computed elsewhere.
    ///
    /// Returns `false` (and keeps the old target) if the buffer does not
    /// match the grid's vertex count.
    pub fn install_target(&mut self, target: Vec<f32>) -> bool {
        if target.len() != self.target.len() {
            log::warn!(
                "Rejected target field with {} heights for a {}-vertex grid",
                target.len(),
                self.target.len()
            );
            return false;
        }
        self.target = target;
        self.band_range = self.interior_range();
        self.state = RelaxState::Relaxing;
        self.frames_since_normals = 0;
        self.relax_elapsed_s = 0.0;
        true
    }

    /// Advance `current` toward `target` by `delta_s` seconds.
    ///
    /// Returns whether normals should be recomputed this frame: every
    /// `normal_interval_frames` frames while relaxing, and once on settling.
    /// A zero or negative delta changes nothing.
    pub fn tick(&mut self, delta_s: f32) -> bool {
        if self.state == RelaxState::Idle || !(delta_s > 0.0) {
            return false;
        }

        let factor = relax_factor(self.relax_rate_per_s, delta_s);
        let mut max_delta = 0.0_f32;
        for (current, &target) in self.current.iter_mut().zip(&self.target) {
            *current += (target - *current) * factor;
            max_delta = max_delta.max((target - *current).abs());
        }
        self.relax_elapsed_s += delta_s;

        if max_delta < self.settle_epsilon_m {
            self.current.copy_from_slice(&self.target);
            self.state = RelaxState::Idle;
            self.frames_since_normals = 0;
            log::debug!("Terrain settled after {:.2}s", self.relax_elapsed_s);
            return true;
        }

        self.frames_since_normals += 1;
        if self.frames_since_normals >= self.normal_interval_frames {
            self.frames_since_normals = 0;
            true
        } else {
            false
        }
    }

    /// Recompute per-vertex normals from `current` by central differences
    pub fn recompute_normals(&mut self) {
        let side = self.grid.side();
        let spacing = self.grid.spacing();
        let heights = &self.current;

        self.normals
            .par_chunks_mut(side)
            .enumerate()
            .for_each(|(row, normals_row)| {
                let up = (row + 1).min(side - 1);
                let down = row.saturating_sub(1);
                for (col, normal) in normals_row.iter_mut().enumerate() {
                    let right = (col + 1).min(side - 1);
                    let left = col.saturating_sub(1);

                    let dx = (heights[row * side + right] - heights[row * side + left])
                        / ((right - left) as f32 * spacing);
                    let dz = (heights[up * side + col] - heights[down * side + col])
                        / ((up - down) as f32 * spacing);

                    *normal = Vec3::new(-dx, 1.0, -dz).normalize().to_array();
                }
            });
    }

    /// Write render vertices for the current heights into `out`
    pub fn write_vertices(&self, out: &mut Vec<TerrainVertex>) {
        let (low, high) = self.band_range;
        let span = (high - low).max(1e-3);
        out.clear();
        out.extend(self.current.iter().enumerate().map(|(i, &height)| {
            let (x, z) = self.grid.position(i);
            TerrainVertex {
                position: [x, height, z],
                normal: self.normals[i],
                uv: self.grid.uv(i),
                band: ((height - low) / span).clamp(0.0, 1.0),
            }
        }));
    }

    pub fn vertices(&self) -> Vec<TerrainVertex> {
        let mut out = Vec::with_capacity(self.current.len());
        self.write_vertices(&mut out);
        out
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn synthesizer(&self) -> &HeightSynthesizer {
        &self.synthesizer
    }

    pub fn state(&self) -> RelaxState {
        self.state
    }

    pub fn current(&self) -> &[f32] {
        &self.current
    }

    pub fn target(&self) -> &[f32] {
        &self.target
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Min and max target height inside the untouched inner radius
    fn interior_range(&self) -> (f32, f32) {
        let inner_sq = self.falloff_inner_m * self.falloff_inner_m;
        let mut range: Option<(f32, f32)> = None;
        for (i, &h) in self.target.iter().enumerate() {
            let (x, z) = self.grid.position(i);
            if x * x + z * z > inner_sq {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(h), hi.max(h)),
                None => (h, h),
            });
        }
        range.unwrap_or((0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeCatalog;
    use crate::noise::NoiseField;

    fn small_mesh(biome: &BiomeParams) -> TerrainMesh {
        let params = TerrainParams {
            grid_segments: 24,
            ..Default::default()
        };
        let grid = GridLayout::new(params.grid_segments, params.plane_size_m);
        let synth = HeightSynthesizer::new(NoiseField::new(5), &params);
        TerrainMesh::new(grid, synth, &params, biome)
    }

    fn max_gap(mesh: &TerrainMesh) -> f32 {
        mesh.current()
            .iter()
            .zip(mesh.target())
            .map(|(c, t)| (c - t).abs())
            .fold(0.0, f32::max)
    }

    fn ticks_until_idle(mesh: &mut TerrainMesh, dt: f32, limit: usize) -> Option<usize> {
        (1..=limit).find(|_| {
            mesh.tick(dt);
            mesh.state() == RelaxState::Idle
        })
    }

    #[test]
    fn test_buffers_match_grid() {
        let catalog = BiomeCatalog::builtin();
        let mesh = small_mesh(catalog.get(0).unwrap());
        let n = mesh.grid().vertex_count();
        assert_eq!(mesh.current().len(), n);
        assert_eq!(mesh.target().len(), n);
        assert_eq!(mesh.normals().len(), n);
        assert_eq!(mesh.vertices().len(), n);
        assert_eq!(mesh.state(), RelaxState::Relaxing);
    }

    #[test]
    fn test_converges_within_three_seconds() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(0).unwrap());
        let limit = (3.0 / 0.016) as usize;

        assert!(ticks_until_idle(&mut mesh, 0.016, limit).is_some());
        assert_eq!(max_gap(&mesh), 0.0);

        mesh.on_biome_changed(catalog.get(4).unwrap());
        assert_eq!(mesh.state(), RelaxState::Relaxing);
        assert!(ticks_until_idle(&mut mesh, 0.016, limit).is_some());
        assert_eq!(mesh.current(), mesh.target());
    }

    #[test]
    fn test_zero_tick_is_idempotent() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(2).unwrap());
        mesh.tick(0.016);
        let before = mesh.current().to_vec();
        for _ in 0..10 {
            assert!(!mesh.tick(0.0));
        }
        assert_eq!(mesh.current(), &before[..]);
    }

    #[test]
    fn test_normals_throttled_while_relaxing() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(1).unwrap());
        let due: Vec<bool> = (0..6).map(|_| mesh.tick(0.001)).collect();
        assert_eq!(due, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_settling_requests_final_normals() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(3).unwrap());
        let mut last = false;
        while mesh.state() == RelaxState::Relaxing {
            last = mesh.tick(0.05);
        }
        assert!(last);
        assert!(!mesh.tick(0.05));
    }

    #[test]
    fn test_large_step_does_not_overshoot() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(0).unwrap());
        mesh.tick(10.0);
        assert_eq!(mesh.state(), RelaxState::Idle);
        assert_eq!(mesh.current(), mesh.target());
    }

    #[test]
    fn test_flat_field_normals_point_up() {
        let catalog = BiomeCatalog::builtin();
        let mut flat = catalog.get(0).unwrap().clone();
        flat.base_height_scale = 0.0;
        let mut mesh = small_mesh(&flat);
        mesh.tick(10.0);
        mesh.recompute_normals();

        let grid = *mesh.grid();
        let centre = grid.index(grid.side() / 2, grid.side() / 2);
        assert_eq!(mesh.normals()[centre], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_normals_are_unit_length() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(4).unwrap());
        mesh.tick(10.0);
        mesh.recompute_normals();
        for n in mesh.normals() {
            let len = Vec3::from_array(*n).length();
            assert!((len - 1.0).abs() < 1e-4);
            assert!(n[1] > 0.0);
        }
    }

    #[test]
    fn test_install_rejects_wrong_length() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(0).unwrap());
        let before = mesh.target().to_vec();
        assert!(!mesh.install_target(vec![1.0; 3]));
        assert_eq!(mesh.target(), &before[..]);
    }

    #[test]
    fn test_band_stays_in_unit_range() {
        let catalog = BiomeCatalog::builtin();
        let mut mesh = small_mesh(catalog.get(2).unwrap());
        mesh.tick(10.0);
        assert!(mesh.vertices().iter().all(|v| (0.0..=1.0).contains(&v.band)));
    }
}
