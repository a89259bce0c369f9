//! Deterministic 2D gradient noise for terrain and shading.
//!
//! Wraps OpenSimplex from the `noise` crate. One process-wide field is seeded
//! once and shared, so identical coordinates always give identical heights and
//! the baked shading texture matches the terrain it decorates.

use std::sync::OnceLock;

use noise::{NoiseFn, OpenSimplex};

/// Seed used when nothing calls [`NoiseField::init_global`] before first use
pub const DEFAULT_SEED: u32 = 42;

static GLOBAL: OnceLock<NoiseField> = OnceLock::new();

/// Continuous noise source returning values in [-1, 1]
#[derive(Clone, Copy, Debug)]
pub struct NoiseField {
    simplex: OpenSimplex,
    seed: u32,
}

impl NoiseField {
    /// Create a standalone noise field with seed
    pub fn new(seed: u32) -> Self {
        Self {
            simplex: OpenSimplex::new(seed),
            seed,
        }
    }

    /// Seed the process-wide field. Returns `false` if it was already seeded,
    /// in which case the existing seed stays in effect.
    pub fn init_global(seed: u32) -> bool {
        let mut installed = false;
        GLOBAL.get_or_init(|| {
            installed = true;
            NoiseField::new(seed)
        });
        installed
    }

    /// Process-wide field, seeded with [`DEFAULT_SEED`] if not yet initialised
    pub fn global() -> &'static NoiseField {
        GLOBAL.get_or_init(|| NoiseField::new(DEFAULT_SEED))
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sample 2D noise at (x, z)
    ///
    /// Returns value in range [-1, 1]
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let value = self.simplex.get([x as f64, z as f64]) as f32;
        value.clamp(-1.0, 1.0)
    }

    /// Sample a periodic field over the unit square: (u, v) and (u + 1, v)
    /// give the same value, as do (u, v) and (u, v + 1).
    ///
    /// Walks two circles of radius `radius` in 4D noise, so the statistics
    /// are the same everywhere in the tile. `offset` picks an independent
    /// slice of the field.
    pub fn sample_torus(&self, u: f32, v: f32, radius: f32, offset: f32) -> f32 {
        let a = (u as f64) * std::f64::consts::TAU;
        let b = (v as f64) * std::f64::consts::TAU;
        let r = radius as f64;
        let o = offset as f64;
        let value = self
            .simplex
            .get([r * a.cos() + o, r * a.sin() - o, r * b.cos() + o, r * b.sin() - o])
            as f32;
        value.clamp(-1.0, 1.0)
    }
}
