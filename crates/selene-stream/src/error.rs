//! Streaming error types.

use selene_cubesphere::TileAddress;

/// Errors raised while loading, decoding, or uploading tile textures.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The tile's backing resource could not be read.
    #[error("failed to read tile {address}")]
    TileRead {
        address: TileAddress,
        #[source]
        source: std::io::Error,
    },

    /// The tile's bytes were read but could not be decoded into pixels.
    #[error("failed to decode tile {address}")]
    TileDecode {
        address: TileAddress,
        #[source]
        source: image::ImageError,
    },

    /// The decoded tile does not have the dimensions the channel requires.
    #[error("tile {address} decoded to {actual_width}x{actual_height}, expected {expected}x{expected}")]
    TileSizeMismatch {
        address: TileAddress,
        expected: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The slot allocator has no free slot left. A capacity violation: the
    /// configured slot budget is too small for the working set.
    #[error("texture slot space exhausted while uploading tile {address}")]
    SlotsExhausted { address: TileAddress },
}
