//! Streaming-texture management for cube-sphere terrain: per-tile cache
//! records with a two-stage load state machine, the tile source and GPU
//! slot allocation seams, and the background decode scheduler.

mod cache;
mod error;
mod pixel;
mod scheduler;
mod slots;
mod source;

pub use cache::{HeightRange, LoadSettings, TileTextures};
pub use error::StreamError;
pub use pixel::{PixelBuffer, PixelFormat};
pub use scheduler::TaskPool;
pub use slots::{SlotId, SlotRegion, TextureChannel, TextureSlots};
pub use source::{DiskTileSource, TileSource};
