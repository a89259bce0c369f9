//! Parameter definitions with physical units and documented semantics.
//!
//! Empirically tuned constants (falloff radii, phase breakpoints, accent
//! colours) live here as defaults rather than inline in the algorithms.

mod camera;
mod cycle;
mod render;
mod shading;
mod terrain;

// Re-export all types
pub use camera::OrbitCameraPath;
pub use cycle::CycleParams;
pub use render::RenderConfig;
pub use shading::{RippleLayer, ShadingParams};
pub use terrain::TerrainParams;
