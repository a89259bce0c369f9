//! Host-side scene state: which biome is active and where the day is.
//!
//! The engine only reads these values each frame; the host owns changes.

use crate::atmosphere::wrap_phase;

/// Active biome index and day/night phase
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    biome_index: usize,
    biome_count: usize,
    phase: f32,
}

impl SceneState {
    /// Start at noon in the first biome
    pub fn new(biome_count: usize) -> Self {
        Self {
            biome_index: 0,
            biome_count: biome_count.max(1),
            phase: 0.5,
        }
    }

    pub fn biome_index(&self) -> usize {
        self.biome_index
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Daytime while the sun is above the horizon
    pub fn is_day(&self) -> bool {
        self.phase > 0.25 && self.phase < 0.75
    }

    pub fn next_biome(&mut self) -> usize {
        self.biome_index = (self.biome_index + 1) % self.biome_count;
        self.biome_index
    }

    pub fn prev_biome(&mut self) -> usize {
        self.biome_index = (self.biome_index + self.biome_count - 1) % self.biome_count;
        self.biome_index
    }

    /// Select a biome; out-of-range indices wrap
    pub fn set_biome(&mut self, index: usize) {
        self.biome_index = index % self.biome_count;
    }

    /// Set the phase, wrapped into [0, 1)
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap_phase(phase);
    }

    /// Advance the phase by `delta_s` for a full cycle lasting `day_length_s`
    pub fn advance_phase(&mut self, delta_s: f32, day_length_s: f32) {
        if day_length_s > 0.0 && delta_s > 0.0 {
            self.set_phase(self.phase + delta_s / day_length_s);
        }
    }
}
