//! Error types for catalog loading and parameter validation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a biome catalog. Loading is all-or-nothing.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON was malformed or an entry is missing a required field.
    #[error("invalid catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    /// A palette entry is not a `#RRGGBB` colour.
    #[error("biome '{biome}': palette field '{field}' is not a #RRGGBB colour: '{value}'")]
    InvalidColor {
        biome: String,
        field: &'static str,
        value: String,
    },

    /// A terrain parameter is NaN or infinite.
    #[error("biome '{biome}': terrain field '{field}' must be finite")]
    NonFinite { biome: String, field: &'static str },

    /// Catalog has no entries.
    #[error("catalog contains no biomes")]
    Empty,
}

/// Errors raised by `validate()` on the parameter structs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("grid must have at least one segment per side")]
    EmptyGrid,

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("falloff inner radius {inner} must be below outer radius {outer}")]
    InvertedFalloff { inner: f32, outer: f32 },

    #[error("phase breakpoints must increase strictly within (0, 1): {0:?}")]
    PhaseBreakpoints([f32; 6]),

    #[error("noise texture size must be non-zero")]
    EmptyNoiseTexture,
}
