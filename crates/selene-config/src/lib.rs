//! Configuration for the terrain core.
//!
//! Runtime-configurable settings that persist to disk as RON files, with
//! hot-reload detection and forward/backward compatible serialization.

mod config;
mod error;

pub use config::{LodSettings, PlanetSettings, StreamingSettings, TerrainConfig};
pub use error::ConfigError;
