//! Continuous LOD selection for cube-sphere terrain.
//!
//! Six face quadtrees select geometry patches by camera distance every
//! frame, resolve each patch's textures against the streaming cache with
//! ancestor fallback, and age out subtrees the camera has left behind.
//! The output is a flat render list an external renderer draws instanced.

mod error;
mod node;
mod render_list;
mod resolve;
mod root;
#[cfg(test)]
mod testing;

pub use error::TerrainError;
pub use node::{TerrainNode, TreeParams};
pub use render_list::{
    GpuSlotBinding, PatchEntry, PatchInstance, QuadrantMask, RenderList, SlotBinding,
    StreamedTextureBinding, TextureBinding,
};
pub use resolve::HopThresholds;
pub use root::TerrainSphere;
