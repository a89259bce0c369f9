//! Procedural desert terrain: height synthesis, relaxing mesh, biome switching.

mod grid;
mod height;
mod mesh;
mod system;

// Re-export public types
pub use grid::GridLayout;
pub use height::HeightSynthesizer;
pub use mesh::{RelaxState, TerrainMesh, TerrainVertex};
pub use system::TerrainSystem;
