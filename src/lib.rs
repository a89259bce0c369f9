//! Dunescape library - procedural desert terrain with a day/night cycle

pub mod atmosphere;
pub mod biome;
pub mod camera;
pub mod cli;
pub mod color;
pub mod engine;
pub mod error;
pub mod math;
pub mod noise;
pub mod params;
pub mod rendering;
pub mod shading;
pub mod state;
pub mod terrain;
