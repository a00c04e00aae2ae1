//! Terrain configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level terrain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Planet geometry settings.
    pub planet: PlanetSettings,
    /// LOD selection settings.
    pub lod: LodSettings,
    /// Texture streaming settings.
    pub streaming: StreamingSettings,
}

/// Planet geometry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetSettings {
    /// Planet radius in world units.
    pub radius: f64,
}

/// LOD selection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodSettings {
    /// Per-face heightmap resolution in texels; also the face edge length in
    /// face-local units.
    pub heightmap_resolution: u32,
    /// Geometry patch resolution in quads per edge. The root level is
    /// `log2(heightmap_resolution / patch_resolution)`; both values must be
    /// powers of two.
    pub patch_resolution: u32,
    /// Culling sphere radius for level-0 geometry, in face-local units.
    /// Doubles per level.
    pub leaf_distance: f64,
    /// Nodes are never subdivided below this level, regardless of distance.
    pub min_subdivision_level: u8,
    /// Frames a node may go unvisited before its subtree is evicted.
    pub ttl_frames: u32,
    /// Hard cap on render-list entries per frame.
    pub max_render_entries: usize,
}

/// Texture streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingSettings {
    /// Ancestor hops before an elevation texture may drive geometry.
    pub geometry_hop: u8,
    /// Ancestor hops before an elevation texture may drive normals.
    pub normal_hop: u8,
    /// Ancestor hops before a diffuse texture may be used.
    pub diffuse_hop: u8,
    /// Smallest LOD level that has its own elevation tile.
    pub min_elevation_level: u8,
    /// Smallest LOD level that has its own diffuse tile.
    pub min_diffuse_level: u8,
    /// Edge length of one elevation tile in texels.
    pub elevation_tile_size: u32,
    /// Edge length of one diffuse tile in texels.
    pub diffuse_tile_size: u32,
    /// World-unit height per encoded elevation step.
    pub height_scale: f64,
    /// World-unit height of encoded elevation zero.
    pub height_offset: f64,
    /// Background decode threads (0 = derive from CPU count).
    pub worker_threads: usize,
}

impl Default for PlanetSettings {
    fn default() -> Self {
        Self { radius: 200_000.0 }
    }
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            heightmap_resolution: 8192,
            patch_resolution: 64,
            leaf_distance: 96.0,
            min_subdivision_level: 0,
            ttl_frames: 64,
            max_render_entries: 4096,
        }
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            geometry_hop: 1,
            normal_hop: 2,
            diffuse_hop: 1,
            min_elevation_level: 2,
            min_diffuse_level: 2,
            elevation_tile_size: 512,
            diffuse_tile_size: 512,
            height_scale: 0.1,
            height_offset: 0.0,
            worker_threads: 0,
        }
    }
}

impl LodSettings {
    /// The root LOD level of every face quadtree.
    #[must_use]
    pub fn root_level(&self) -> u8 {
        (self.heightmap_resolution / self.patch_resolution.max(1))
            .max(1)
            .ilog2() as u8
    }

    /// Face edge length in face-local units.
    #[must_use]
    pub fn face_size(&self) -> f64 {
        f64::from(self.heightmap_resolution)
    }
}

// --- Load / Save / Reload ---

impl TerrainConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("terrain.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: TerrainConfig =
                ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded terrain config from {}", config_path.display());
            Ok(config)
        } else {
            let config = TerrainConfig::default();
            config.save(config_dir)?;
            log::info!("Created default terrain config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `terrain.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("terrain.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("terrain.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: TerrainConfig =
            ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Terrain config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
