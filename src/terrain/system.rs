//! High-level terrain system: biome switches, deferred target computation.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use super::grid::GridLayout;
use super::height::HeightSynthesizer;
use super::mesh::{RelaxState, TerrainMesh};
use crate::biome::BiomeParams;
use crate::noise::NoiseField;
use crate::params::TerrainParams;

/// Target field being computed on a worker thread
struct PendingTarget {
    biome_name: String,
    receiver: Receiver<Vec<f32>>,
}

/// Terrain mesh plus the policy for recomputing its target on biome change.
///
/// Large grids synthesize the new target on a worker thread. The finished
/// buffer replaces the old target in one swap, so relaxation never reads a
/// partially written field. Only the most recent request is kept; results of
/// superseded requests are discarded with their channel.
pub struct TerrainSystem {
    pub mesh: TerrainMesh,
    background_vertex_threshold: usize,
    pending: Option<PendingTarget>,
}

impl TerrainSystem {
    pub fn new(params: &TerrainParams, noise: NoiseField, biome: &BiomeParams) -> Self {
        let grid = GridLayout::new(params.grid_segments, params.plane_size_m);
        let synthesizer = HeightSynthesizer::new(noise, params);
        Self {
            mesh: TerrainMesh::new(grid, synthesizer, params, biome),
            background_vertex_threshold: params.background_vertex_threshold,
            pending: None,
        }
    }

    /// Begin transitioning to `biome`
    pub fn set_biome(&mut self, biome: &BiomeParams) {
        let grid = *self.mesh.grid();
        if grid.vertex_count() <= self.background_vertex_threshold {
            self.pending = None;
            self.mesh.on_biome_changed(biome);
            log::info!("Terrain relaxing toward '{}'", biome.name);
            return;
        }

        let synthesizer = *self.mesh.synthesizer();
        let worker_biome = biome.clone();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let field = synthesizer.synthesize_field(&grid, &worker_biome);
            // Receiver is gone if a newer biome superseded this one
            let _ = sender.send(field);
        });

        log::info!(
            "Computing '{}' terrain in background ({} vertices)",
            biome.name,
            grid.vertex_count()
        );
        self.pending = Some(PendingTarget {
            biome_name: biome.name.clone(),
            receiver,
        });
    }

    /// Whether a background target is still being computed
    pub fn is_computing(&self) -> bool {
        self.pending.is_some()
    }

    /// Block until any background target has been installed
    pub fn finish_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            match pending.receiver.recv() {
                Ok(field) => self.install(field, &pending.biome_name),
                Err(_) => log::warn!(
                    "Background terrain for '{}' was lost",
                    pending.biome_name
                ),
            }
        }
    }

    /// Per-frame update. Returns whether normals were recomputed.
    pub fn update(&mut self, delta_s: f32) -> bool {
        self.poll_pending();

        let normals_due = self.mesh.tick(delta_s);
        if normals_due {
            self.mesh.recompute_normals();
        }
        normals_due
    }

    pub fn state(&self) -> RelaxState {
        self.mesh.state()
    }

    fn poll_pending(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        match pending.receiver.try_recv() {
            Ok(field) => {
                let name = pending.biome_name.clone();
                self.pending = None;
                self.install(field, &name);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::warn!(
                    "Background terrain for '{}' was lost",
                    pending.biome_name
                );
                self.pending = None;
            }
        }
    }

    fn install(&mut self, field: Vec<f32>, biome_name: &str) {
        if self.mesh.install_target(field) {
            log::debug!("Installed background terrain for '{}'", biome_name);
        }
    }
}
