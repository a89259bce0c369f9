//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::biome::BiomeCatalog;
use crate::error::CatalogError;
use crate::noise::DEFAULT_SEED;
use crate::params::TerrainParams;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Dunescape")]
#[command(about = "Procedural desert dunes with a day/night cycle", long_about = None)]
pub struct Args {
    /// Starting biome, by catalog name or index
    #[arg(long, value_name = "NAME|INDEX")]
    pub biome: Option<String>,

    /// Starting day phase: 0 midnight, 0.25 sunrise, 0.5 noon, 0.75 sunset
    #[arg(long, value_name = "PHASE", default_value_t = 0.5)]
    pub phase: f32,

    /// Seconds per full day/night cycle (0 freezes the phase)
    #[arg(long, value_name = "SECONDS", default_value_t = 120.0)]
    pub day_length: f32,

    /// Noise seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u32,

    /// Terrain grid segments per side
    #[arg(long, value_name = "SEGMENTS")]
    pub grid: Option<usize>,

    /// Biome catalog JSON file (defaults to the built-in deserts)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Write the shading noise texture to a PNG and exit
    #[arg(long, value_name = "PNG")]
    pub bake_noise: Option<PathBuf>,

    /// Write the selected biome's height field to a grayscale PNG and exit
    #[arg(long, value_name = "PNG")]
    pub export_heightmap: Option<PathBuf>,
}

impl Args {
    /// Built-in catalog unless a file was given
    pub fn load_catalog(&self) -> Result<BiomeCatalog, CatalogError> {
        match &self.catalog {
            Some(path) => BiomeCatalog::load(path),
            None => Ok(BiomeCatalog::builtin()),
        }
    }

    /// Index of the requested starting biome; unknown names fall back to the first
    pub fn resolve_biome(&self, catalog: &BiomeCatalog) -> usize {
        let Some(wanted) = self.biome.as_deref() else {
            return 0;
        };
        if let Ok(index) = wanted.parse::<usize>() {
            return index % catalog.len().max(1);
        }
        match catalog
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(wanted))
        {
            Some(index) => index,
            None => {
                log::warn!("Unknown biome '{}', using '{}'", wanted, catalog.get_wrapped(0).name);
                0
            }
        }
    }

    /// Terrain parameters with command-line overrides applied
    pub fn terrain_params(&self) -> TerrainParams {
        let mut params = TerrainParams::default();
        if let Some(segments) = self.grid {
            params.grid_segments = segments;
        }
        params
    }

    /// Either of the export-and-exit modes was requested
    pub fn is_headless(&self) -> bool {
        self.bake_noise.is_some() || self.export_heightmap.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dunescape").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.phase, 0.5);
        assert_eq!(args.seed, DEFAULT_SEED);
        assert!(!args.is_headless());
        assert_eq!(args.terrain_params().grid_segments, TerrainParams::default().grid_segments);
    }

    #[test]
    fn test_resolve_biome_by_name_and_index() {
        let catalog = BiomeCatalog::builtin();
        assert_eq!(parse(&["--biome", "velvet twilight"]).resolve_biome(&catalog), 2);
        assert_eq!(parse(&["--biome", "6"]).resolve_biome(&catalog), 1);
        assert_eq!(parse(&["--biome", "Atlantis"]).resolve_biome(&catalog), 0);
    }

    #[test]
    fn test_grid_override_and_headless() {
        let args = parse(&["--grid", "64", "--export-heightmap", "out.png"]);
        assert_eq!(args.terrain_params().grid_segments, 64);
        assert!(args.is_headless());
    }

    #[test]
    fn test_missing_catalog_file_is_error() {
        let args = parse(&["--catalog", "/nonexistent/deserts.json"]);
        assert!(matches!(args.load_catalog(), Err(CatalogError::Io { .. })));
    }
}
