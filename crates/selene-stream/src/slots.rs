//! GPU texture slot allocation seam.
//!
//! The renderer owns the actual atlas/array textures; this module only
//! defines the contract the streaming core drives. Slots are allocated,
//! uploaded, and freed exclusively from the main thread.

use crate::{PixelBuffer, StreamError};
use selene_cubesphere::TileAddress;

/// Identifier of one slot in the renderer's bounded slot space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// Which tile texture channel a slot holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    /// Encoded elevation (also sampled for normals).
    Elevation,
    /// Diffuse color.
    Diffuse,
}

/// Placement of one tile inside the renderer's slot space: the slot plus the
/// normalized top-left position and edge length the renderer assigned to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotRegion {
    /// The allocated slot.
    pub slot: SlotId,
    /// Top-left corner in normalized atlas coordinates.
    pub offset: [f32; 2],
    /// Edge length in normalized atlas coordinates.
    pub size: f32,
}

/// The renderer-side slot allocator and uploader.
///
/// Allocation fails with [`StreamError::SlotsExhausted`] when the bounded
/// slot space is full; the caller treats that as a capacity violation.
pub trait TextureSlots {
    /// Claim a free slot for `channel`, recording `address` for diagnostics.
    fn allocate(
        &mut self,
        channel: TextureChannel,
        address: TileAddress,
    ) -> Result<SlotRegion, StreamError>;

    /// Push pixel data into a previously allocated slot.
    fn upload(&mut self, channel: TextureChannel, slot: SlotId, pixels: &PixelBuffer);

    /// Return a slot to the free set.
    fn free(&mut self, channel: TextureChannel, slot: SlotId);
}
