//! The per-frame render list and its entry types.
//!
//! Selection appends one entry per drawn patch; a renderer external to this
//! core consumes the list once per frame. Entry order carries no meaning, a
//! consumer is free to sort or batch.

use bytemuck::{Pod, Zeroable};
use selene_cubesphere::{CubeFace, TileWindow};
use selene_stream::SlotRegion;

use crate::TerrainError;

/// Which quadrants of a patch an entry covers.
///
/// Bit `q` covers quadrant `q` (bit 0 = +x half, bit 1 = +z half, matching
/// child indexing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadrantMask(pub u8);

impl QuadrantMask {
    /// No quadrants.
    pub const EMPTY: QuadrantMask = QuadrantMask(0);
    /// All four quadrants.
    pub const FULL: QuadrantMask = QuadrantMask(0b1111);

    /// Mark quadrant `q` as covered.
    pub fn set(&mut self, q: usize) {
        debug_assert!(q < 4, "quadrant {q} out of range");
        self.0 |= 1 << q;
    }

    /// Whether quadrant `q` is covered.
    #[must_use]
    pub fn contains(&self, q: usize) -> bool {
        self.0 & (1 << q) != 0
    }

    /// The quadrants not covered by this mask.
    #[must_use]
    pub fn complement(&self) -> QuadrantMask {
        QuadrantMask(!self.0 & 0b1111)
    }

    /// Whether no quadrant is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of covered quadrants.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

/// One texture reference inside the renderer's slot space: the supplying
/// slot's placement composed with the window of it that covers the patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotBinding {
    /// Slot index.
    pub slot: u32,
    /// Top-left corner in normalized atlas coordinates.
    pub offset: [f32; 2],
    /// Edge length in normalized atlas coordinates.
    pub size: f32,
}

impl SlotBinding {
    /// Compose a slot placement with a sub-window of the tile it holds.
    #[must_use]
    pub fn compose(region: SlotRegion, window: TileWindow) -> Self {
        Self {
            slot: region.slot.0,
            offset: [
                region.offset[0] + window.offset[0] * region.size,
                region.offset[1] + window.offset[1] * region.size,
            ],
            size: region.size * window.scale,
        }
    }
}

/// Current and next texture references for one channel, letting a renderer
/// interpolate across an LOD transition instead of popping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureBinding {
    /// The texture in use at this LOD.
    pub current: SlotBinding,
    /// The coarser texture to blend toward.
    pub next: SlotBinding,
}

/// Resolved bindings for all three channels of one patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamedTextureBinding {
    /// Elevation sampled for vertex displacement.
    pub geometry: TextureBinding,
    /// Elevation sampled for normal reconstruction.
    pub normal: TextureBinding,
    /// Diffuse color.
    pub diffuse: TextureBinding,
}

/// One draw request: a patch footprint plus its resolved textures.
#[derive(Clone, Copy, Debug)]
pub struct PatchEntry {
    /// Cube face of the patch.
    pub face: CubeFace,
    /// LOD level of the patch.
    pub level: u8,
    /// Face-local minimum corner of the patch footprint.
    pub offset: [f64; 2],
    /// Edge length of the full footprint in face-local units.
    pub size: f64,
    /// Which quadrants to draw (`FULL` for a selection leaf, a ring for a
    /// node that delegated some quadrants to children).
    pub quadrants: QuadrantMask,
    /// Per-channel texture bindings.
    pub textures: StreamedTextureBinding,
}

/// GPU layout of one slot binding inside a patch instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuSlotBinding {
    /// Normalized atlas offset.
    pub offset: [f32; 2],
    /// Normalized atlas size.
    pub size: f32,
    /// Slot index.
    pub slot: u32,
}

impl From<SlotBinding> for GpuSlotBinding {
    fn from(b: SlotBinding) -> Self {
        Self {
            offset: b.offset,
            size: b.size,
            slot: b.slot,
        }
    }
}

/// Instance data a renderer uploads for one patch entry.
///
/// Bindings are ordered geometry current/next, normal current/next,
/// diffuse current/next.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PatchInstance {
    /// Face-local minimum corner of the footprint.
    pub offset: [f32; 2],
    /// Edge length of the full footprint.
    pub size: f32,
    /// LOD level.
    pub level: u32,
    /// Cube face index.
    pub face: u32,
    /// Quadrant inclusion mask.
    pub quadrants: u32,
    pub _pad: [u32; 2],
    /// Channel bindings.
    pub bindings: [GpuSlotBinding; 6],
}

impl From<&PatchEntry> for PatchInstance {
    fn from(entry: &PatchEntry) -> Self {
        let t = &entry.textures;
        Self {
            offset: [entry.offset[0] as f32, entry.offset[1] as f32],
            size: entry.size as f32,
            level: u32::from(entry.level),
            face: entry.face.index() as u32,
            quadrants: u32::from(entry.quadrants.0),
            _pad: [0; 2],
            bindings: [
                t.geometry.current.into(),
                t.geometry.next.into(),
                t.normal.current.into(),
                t.normal.next.into(),
                t.diffuse.current.into(),
                t.diffuse.next.into(),
            ],
        }
    }
}

/// Flat accumulator for one frame's patch entries, capped at a fixed size.
///
/// Cleared and refilled every frame; the allocation is reused.
pub struct RenderList {
    entries: Vec<PatchEntry>,
    cap: usize,
}

impl RenderList {
    /// Create a list with a hard entry cap.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap.min(1024)),
            cap,
        }
    }

    /// Append an entry, failing once the cap is reached.
    pub fn push(&mut self, entry: PatchEntry) -> Result<(), TerrainError> {
        if self.entries.len() >= self.cap {
            return Err(TerrainError::RenderListFull { cap: self.cap });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Discard all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The accumulated entries.
    #[must_use]
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the GPU instance array for this frame's entries.
    #[must_use]
    pub fn instances(&self) -> Vec<PatchInstance> {
        self.entries.iter().map(PatchInstance::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_stream::SlotId;

    fn dummy_binding() -> StreamedTextureBinding {
        let b = SlotBinding {
            slot: 0,
            offset: [0.0, 0.0],
            size: 1.0,
        };
        let pair = TextureBinding {
            current: b,
            next: b,
        };
        StreamedTextureBinding {
            geometry: pair,
            normal: pair,
            diffuse: pair,
        }
    }

    fn dummy_entry() -> PatchEntry {
        PatchEntry {
            face: CubeFace::PosY,
            level: 3,
            offset: [0.0, 0.0],
            size: 128.0,
            quadrants: QuadrantMask::FULL,
            textures: dummy_binding(),
        }
    }

    #[test]
    fn test_quadrant_mask_ring_is_exact_complement() {
        for bits in 0..16u8 {
            let covered = QuadrantMask(bits);
            let ring = covered.complement();
            for q in 0..4 {
                assert!(
                    covered.contains(q) != ring.contains(q),
                    "quadrant {q} must be in exactly one of covered/ring for bits {bits:#06b}"
                );
            }
            assert_eq!(covered.count() + ring.count(), 4);
        }
    }

    #[test]
    fn test_slot_binding_composition() {
        let region = SlotRegion {
            slot: SlotId(7),
            offset: [0.5, 0.0],
            size: 0.5,
        };
        let window = TileWindow {
            offset: [0.5, 0.25],
            scale: 0.25,
        };
        let binding = SlotBinding::compose(region, window);
        assert_eq!(binding.slot, 7);
        assert_eq!(binding.offset, [0.75, 0.125]);
        assert_eq!(binding.size, 0.125);
    }

    #[test]
    fn test_full_window_composition_is_identity_on_region() {
        let region = SlotRegion {
            slot: SlotId(3),
            offset: [0.25, 0.75],
            size: 0.25,
        };
        let binding = SlotBinding::compose(region, TileWindow::FULL);
        assert_eq!(binding.offset, region.offset);
        assert_eq!(binding.size, region.size);
    }

    #[test]
    fn test_render_list_enforces_cap() {
        let mut list = RenderList::new(2);
        list.push(dummy_entry()).expect("first entry fits");
        list.push(dummy_entry()).expect("second entry fits");
        let err = list.push(dummy_entry()).expect_err("cap reached");
        assert!(matches!(err, TerrainError::RenderListFull { cap: 2 }));

        list.clear();
        list.push(dummy_entry()).expect("cap resets with clear");
    }

    #[test]
    fn test_patch_instance_layout() {
        assert_eq!(std::mem::size_of::<GpuSlotBinding>(), 16);
        assert_eq!(std::mem::size_of::<PatchInstance>(), 32 + 6 * 16);

        let mut entry = dummy_entry();
        entry.quadrants = QuadrantMask(0b0110);
        let instance = PatchInstance::from(&entry);
        assert_eq!(instance.face, CubeFace::PosY.index() as u32);
        assert_eq!(instance.level, 3);
        assert_eq!(instance.quadrants, 0b0110);
    }
}
