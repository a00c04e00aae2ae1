//! In-memory tile source and recording slot allocator shared by the
//! crate's tests.

use selene_cubesphere::TileAddress;
use selene_stream::{
    PixelBuffer, PixelFormat, SlotId, SlotRegion, StreamError, TextureChannel, TextureSlots,
    TileSource,
};

/// Synthesizes gradient elevation tiles and flat diffuse tiles.
pub struct TestSource {
    size: u32,
}

impl TestSource {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl TileSource for TestSource {
    fn elevation_size(&self) -> u32 {
        self.size
    }

    fn diffuse_size(&self) -> u32 {
        self.size
    }

    fn load_elevation(&self, address: TileAddress) -> Result<PixelBuffer, StreamError> {
        let mut texels = Vec::with_capacity((self.size * self.size) as usize);
        for y in 0..self.size {
            for x in 0..self.size {
                // Vary with position and level so windows are distinguishable.
                texels.push((u32::from(address.level) * 256 + y * self.size + x) as u16);
            }
        }
        Ok(PixelBuffer::from_raw(
            self.size,
            self.size,
            PixelFormat::R16,
            bytemuck::cast_slice(&texels).to_vec(),
        ))
    }

    fn load_diffuse(&self, _address: TileAddress) -> Result<PixelBuffer, StreamError> {
        let len = (self.size * self.size * 4) as usize;
        Ok(PixelBuffer::from_raw(
            self.size,
            self.size,
            PixelFormat::Rgba8,
            vec![200; len],
        ))
    }
}

/// Sequential-id allocator that records every allocation, upload, and free.
#[derive(Default)]
pub struct RecordingSlots {
    next: u32,
    pub allocated: Vec<(TextureChannel, SlotId)>,
    pub uploaded: Vec<(TextureChannel, SlotId)>,
    pub freed: Vec<(TextureChannel, SlotId)>,
}

impl RecordingSlots {
    /// Slots currently allocated and not freed.
    pub fn live_count(&self) -> usize {
        self.allocated.len() - self.freed.len()
    }
}

impl TextureSlots for RecordingSlots {
    fn allocate(
        &mut self,
        channel: TextureChannel,
        _address: TileAddress,
    ) -> Result<SlotRegion, StreamError> {
        let slot = SlotId(self.next);
        self.next += 1;
        self.allocated.push((channel, slot));
        Ok(SlotRegion {
            slot,
            offset: [0.0, 0.0],
            size: 1.0,
        })
    }

    fn upload(&mut self, channel: TextureChannel, slot: SlotId, _pixels: &PixelBuffer) {
        self.uploaded.push((channel, slot));
    }

    fn free(&mut self, channel: TextureChannel, slot: SlotId) {
        self.freed.push((channel, slot));
    }
}
