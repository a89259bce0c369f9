//! Biome presets: terrain shape and palette for each named desert.
//!
//! The catalog is immutable once loaded. It is either the built-in set of five
//! deserts or a JSON file with the same shape:
//!
//! ```json
//! [{ "name": "Ethereal Dunes",
//!    "colors": { "ground": "#F2D1C9", "groundLow": "#E6B8B0", "groundHigh": "#FFDFD3",
//!                "sky": "#FFF5F5", "fog": "#F2D1C9" },
//!    "terrainParams": { "height": 2.0, "scale": 4, "roughness": 0.4 } }]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::color::Rgb;
use crate::error::CatalogError;

/// Colours shared by the terrain surface, sky and fog of one biome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Mid-tone ground colour
    pub ground: Rgb,
    /// Colour of troughs and shaded bands
    pub ground_low: Rgb,
    /// Colour of crests and lit bands
    pub ground_high: Rgb,
    /// Sky colour during the noon plateau
    pub sky: Rgb,
    /// Fog colour during the noon plateau
    pub fog: Rgb,
}

/// Immutable per-biome parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeParams {
    pub name: String,
    pub description: String,
    /// Vertical scale of the dunes (meters, first-octave amplitude / height gain)
    pub base_height_scale: f32,
    /// Horizontal scale of the dunes (first-octave wavelength / base wavelength)
    pub base_frequency_scale: f32,
    /// Surface roughness in [0, 1], modulates grain and specular response
    pub roughness: f32,
    pub palette: Palette,
}

impl BiomeParams {
    /// Clamp out-of-domain scalars instead of rejecting them.
    ///
    /// Negative scales become zero (flat terrain) and roughness is clamped to
    /// [0, 1].
    pub fn sanitized(mut self) -> Self {
        if self.base_height_scale < 0.0 || self.base_frequency_scale < 0.0 {
            log::warn!(
                "biome '{}': negative terrain scale clamped to zero",
                self.name
            );
        }
        self.base_height_scale = self.base_height_scale.max(0.0);
        self.base_frequency_scale = self.base_frequency_scale.max(0.0);
        self.roughness = self.roughness.clamp(0.0, 1.0);
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ColorsRecord {
    ground: String,
    ground_low: String,
    ground_high: String,
    sky: String,
    fog: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TerrainRecord {
    height: f32,
    scale: f32,
    roughness: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BiomeRecord {
    name: String,
    #[serde(default)]
    description: String,
    colors: ColorsRecord,
    terrain_params: TerrainRecord,
}

impl BiomeRecord {
    fn into_params(self) -> Result<BiomeParams, CatalogError> {
        let name = self.name;
        let color = |field: &'static str, value: &str| {
            Rgb::from_hex(value).ok_or_else(|| CatalogError::InvalidColor {
                biome: name.clone(),
                field,
                value: value.to_string(),
            })
        };
        let palette = Palette {
            ground: color("ground", &self.colors.ground)?,
            ground_low: color("groundLow", &self.colors.ground_low)?,
            ground_high: color("groundHigh", &self.colors.ground_high)?,
            sky: color("sky", &self.colors.sky)?,
            fog: color("fog", &self.colors.fog)?,
        };

        let terrain = self.terrain_params;
        for (field, value) in [
            ("height", terrain.height),
            ("scale", terrain.scale),
            ("roughness", terrain.roughness),
        ] {
            if !value.is_finite() {
                return Err(CatalogError::NonFinite {
                    biome: name.clone(),
                    field,
                });
            }
        }

        Ok(BiomeParams {
            name,
            description: self.description,
            base_height_scale: terrain.height,
            base_frequency_scale: terrain.scale,
            roughness: terrain.roughness,
            palette,
        }
        .sanitized())
    }
}

/// Static, index-addressed biome catalog
#[derive(Debug, Clone)]
pub struct BiomeCatalog {
    biomes: Vec<BiomeParams>,
}

impl BiomeCatalog {
    /// The five built-in deserts
    pub fn builtin() -> Self {
        let desert = |name: &str,
                      description: &str,
                      colors: [&str; 5],
                      height: f32,
                      scale: f32,
                      roughness: f32| {
            let hex = |s: &str| Rgb::from_hex(s).unwrap_or(Rgb::WHITE);
            BiomeParams {
                name: name.to_string(),
                description: description.to_string(),
                base_height_scale: height,
                base_frequency_scale: scale,
                roughness,
                palette: Palette {
                    ground: hex(colors[0]),
                    ground_low: hex(colors[1]),
                    ground_high: hex(colors[2]),
                    sky: hex(colors[3]),
                    fog: hex(colors[4]),
                },
            }
        };

        Self {
            biomes: vec![
                desert(
                    "Ethereal Dunes",
                    "A realm where soft peach sands whisper secrets to the morning sun, creating a sanctuary of warmth and tranquility.",
                    ["#F2D1C9", "#E6B8B0", "#FFDFD3", "#FFF5F5", "#F2D1C9"],
                    2.0,
                    4.0,
                    0.4,
                ),
                desert(
                    "Glacial Serenity",
                    "Crisp, mint-kissed valleys that breathe freshness into the soul, under a sky of infinite possibility.",
                    ["#D4F1F4", "#BCE3E7", "#E2F7F9", "#E8FAFC", "#D4F1F4"],
                    1.5,
                    5.0,
                    0.5,
                ),
                desert(
                    "Velvet Twilight",
                    "A dreamscape bathed in lavender hues, where the boundary between earth and mystery dissolves into starlight.",
                    ["#DCD6F7", "#C5BDF0", "#E5DFFB", "#F4EEFF", "#DCD6F7"],
                    2.2,
                    3.5,
                    0.6,
                ),
                desert(
                    "Golden Hour",
                    "An eternal embrace of amber light, casting long, soft shadows across a landscape of pure nostalgia.",
                    ["#FBE7C6", "#EACD9E", "#FDF0D8", "#FFFCF2", "#FBE7C6"],
                    1.8,
                    6.0,
                    0.3,
                ),
                desert(
                    "Rose Horizon",
                    "Soft pink waves of sand stretching into forever, painting the world with the gentle blush of a first love.",
                    ["#FBC4AB", "#F0AFA0", "#FCD5C3", "#FDE2E4", "#FBC4AB"],
                    2.5,
                    4.5,
                    0.45,
                ),
            ],
        }
    }

    /// Parse a JSON array of biome records. Fails on the first invalid entry.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<BiomeRecord> = serde_json::from_str(json)?;
        let biomes = records
            .into_iter()
            .map(BiomeRecord::into_params)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_biomes(biomes)
    }

    /// Load a JSON catalog from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} biomes from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Build from already-constructed params (sanitized on the way in)
    pub fn from_biomes(biomes: Vec<BiomeParams>) -> Result<Self, CatalogError> {
        if biomes.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            biomes: biomes.into_iter().map(BiomeParams::sanitized).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BiomeParams> {
        self.biomes.get(index)
    }

    /// Look up with the index wrapped into range (negative indices count back)
    pub fn get_wrapped(&self, index: isize) -> &BiomeParams {
        let len = self.biomes.len() as isize;
        &self.biomes[index.rem_euclid(len) as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BiomeParams> {
        self.biomes.iter()
    }
}

impl Default for BiomeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
