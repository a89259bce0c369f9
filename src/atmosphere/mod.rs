//! Day/night atmosphere: colour bands, lighting and per-frame orchestration.

mod controller;
pub mod cycle;

// Re-export public types
pub use controller::AtmosphereController;
pub use cycle::{dayness, wrap_phase, ColorSample, CycleColorModel};
