//! Terrain selection error types.

use selene_stream::StreamError;

/// Errors surfaced by the per-frame selection/aging driver.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// The render list reached its configured entry cap. A capacity
    /// violation: the cap is too small for the current view.
    #[error("render list full ({cap} entries)")]
    RenderListFull { cap: usize },

    /// A texture load or upload failed on the synchronous path.
    #[error(transparent)]
    Stream(#[from] StreamError),
}
