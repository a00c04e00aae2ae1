//! Per-tile texture cache records and the load state machine.
//!
//! Each quadtree node owns one [`TileTextures`] record. A record moves
//! through: unloaded, decoding into memory, in memory, resident on the GPU.
//! The two boolean milestones are atomics with release stores at the
//! transition points, so any thread can read them without the lock; the
//! transitions themselves happen only under the record's mutex, and only one
//! writer ever flips a given flag from false to true.
//!
//! Ancestors are forced ahead of descendants in both stages: a tile's
//! min/max height may derive from an ancestor's pixels, and GPU lookups
//! assume ancestor residency. The forcing is recursive, so the guarantee
//! holds regardless of scheduling order.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};

use selene_cubesphere::TileAddress;

use crate::{PixelBuffer, SlotRegion, StreamError, TextureChannel, TextureSlots, TileSource};

/// Static parameters of the load step.
#[derive(Clone, Copy, Debug)]
pub struct LoadSettings {
    /// Smallest LOD level that still has its own elevation tile. Finer
    /// levels sample a window of an ancestor's texture instead.
    pub min_elevation_level: u8,
    /// Smallest LOD level that still has its own diffuse tile.
    pub min_diffuse_level: u8,
    /// World-unit height per encoded elevation step.
    pub height_scale: f64,
    /// World-unit height of encoded elevation zero.
    pub height_offset: f64,
}

impl LoadSettings {
    /// Decode an encoded elevation value to world units.
    #[must_use]
    pub fn decode_height(&self, encoded: u16) -> f64 {
        self.height_offset + f64::from(encoded) * self.height_scale
    }
}

/// Min/max elevation of a tile footprint, encoded and in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightRange {
    /// Smallest encoded elevation texel.
    pub min_encoded: u16,
    /// Largest encoded elevation texel.
    pub max_encoded: u16,
    /// Smallest elevation in world units.
    pub min_world: f64,
    /// Largest elevation in world units.
    pub max_world: f64,
}

/// Mutable interior of a record, guarded by the load mutex.
struct TileData {
    elevation: Option<PixelBuffer>,
    diffuse: Option<PixelBuffer>,
    elevation_slot: Option<SlotRegion>,
    diffuse_slot: Option<SlotRegion>,
    heights: Option<HeightRange>,
}

/// Texture cache record for one tile.
///
/// Shared as `Arc<TileTextures>` between the owning quadtree node and any
/// worker currently decoding it. The parent link is weak; the quadtree's
/// child ownership is the only strong parent-to-child edge, so no cycle can
/// form and an evicted subtree's records are freed as soon as in-flight
/// workers finish.
pub struct TileTextures {
    address: TileAddress,
    parent: Option<Weak<TileTextures>>,
    data: Mutex<TileData>,
    in_memory: AtomicBool,
    resident: AtomicBool,
    /// Bumped whenever the stored height range changes; nodes compare it to
    /// rebuild bounding volumes lazily.
    height_revision: AtomicU32,
}

fn lock_data(data: &Mutex<TileData>) -> MutexGuard<'_, TileData> {
    match data.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl TileTextures {
    fn empty(address: TileAddress, parent: Option<Weak<TileTextures>>) -> Arc<Self> {
        Arc::new(Self {
            address,
            parent,
            data: Mutex::new(TileData {
                elevation: None,
                diffuse: None,
                elevation_slot: None,
                diffuse_slot: None,
                heights: None,
            }),
            in_memory: AtomicBool::new(false),
            resident: AtomicBool::new(false),
            height_revision: AtomicU32::new(0),
        })
    }

    /// Record for a face root tile.
    #[must_use]
    pub fn new_root(address: TileAddress) -> Arc<Self> {
        Self::empty(address, None)
    }

    /// Record for a child tile, weakly linked to its parent's record.
    #[must_use]
    pub fn new_child(parent: &Arc<TileTextures>, address: TileAddress) -> Arc<Self> {
        Self::empty(address, Some(Arc::downgrade(parent)))
    }

    /// The tile this record belongs to.
    #[must_use]
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// The parent tile's record, while the parent is alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<TileTextures>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this tile's level still has its own elevation data.
    #[must_use]
    pub fn owns_elevation(&self, settings: &LoadSettings) -> bool {
        self.address.level >= settings.min_elevation_level
    }

    /// Whether this tile's level still has its own diffuse data.
    #[must_use]
    pub fn owns_diffuse(&self, settings: &LoadSettings) -> bool {
        self.address.level >= settings.min_diffuse_level
    }

    /// Whether the decode stage has completed.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.in_memory.load(Ordering::Acquire)
    }

    /// Whether the upload stage has completed.
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.resident.load(Ordering::Acquire)
    }

    /// Current height revision; changes whenever [`Self::heights`] changes.
    #[must_use]
    pub fn height_revision(&self) -> u32 {
        self.height_revision.load(Ordering::Acquire)
    }

    /// The tile's height range, once derived by the load step.
    #[must_use]
    pub fn heights(&self) -> Option<HeightRange> {
        lock_data(&self.data).heights
    }

    /// GPU placement of the elevation texture, once uploaded.
    #[must_use]
    pub fn elevation_region(&self) -> Option<SlotRegion> {
        lock_data(&self.data).elevation_slot
    }

    /// GPU placement of the diffuse texture, once uploaded.
    #[must_use]
    pub fn diffuse_region(&self) -> Option<SlotRegion> {
        lock_data(&self.data).diffuse_slot
    }

    /// Decode this tile's pixel data into memory.
    ///
    /// Forces the parent into memory first. With `sync` the call blocks on
    /// the record's load mutex and always finishes the stage (or errors);
    /// without it the call gives up immediately when the lock is contended
    /// and returns `Ok(false)`, so an async caller never stalls a frame and
    /// an in-flight load is never duplicated.
    pub fn load_to_memory(
        &self,
        sync: bool,
        source: &dyn TileSource,
        settings: &LoadSettings,
    ) -> Result<bool, StreamError> {
        if let Some(parent) = self.parent()
            && !parent.is_in_memory()
        {
            parent.load_to_memory(true, source, settings)?;
        }
        if self.is_in_memory() {
            return Ok(true);
        }

        let mut data = if sync {
            lock_data(&self.data)
        } else {
            match self.data.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return Ok(false),
            }
        };
        // Another thread may have finished the stage while we waited.
        if self.is_in_memory() {
            return Ok(true);
        }

        if self.owns_elevation(settings) && data.elevation.is_none() {
            data.elevation = Some(source.load_elevation(self.address)?);
        }
        if self.owns_diffuse(settings) && data.diffuse.is_none() {
            data.diffuse = Some(source.load_diffuse(self.address)?);
        }
        data.heights = self.derive_heights(&data, settings);
        self.height_revision.fetch_add(1, Ordering::Release);
        self.in_memory.store(true, Ordering::Release);
        log::trace!("tile {} loaded to memory", self.address);
        Ok(true)
    }

    /// Min/max height from whichever tile actually holds usable elevation
    /// data: this tile's own buffer, or a window of the nearest ancestor's.
    ///
    /// Locks ancestor records while holding our own lock; safe because the
    /// lock order is always descendant to ancestor.
    fn derive_heights(&self, data: &TileData, settings: &LoadSettings) -> Option<HeightRange> {
        if let Some(elevation) = &data.elevation {
            return range_from(elevation.min_max_r16([0.0, 0.0], 1.0), settings);
        }
        let mut ancestor = self.parent();
        while let Some(record) = ancestor {
            if record.is_in_memory() {
                let ancestor_data = lock_data(&record.data);
                if let Some(elevation) = &ancestor_data.elevation
                    && let Some(window) = self.address.window_in(&record.address)
                {
                    return range_from(elevation.min_max_r16(window.offset, window.scale), settings);
                }
                // The ancestor's buffer was freed after upload; its stored
                // whole-footprint range is a conservative substitute.
                if let Some(heights) = ancestor_data.heights {
                    return Some(heights);
                }
            }
            ancestor = record.parent();
        }
        None
    }

    /// Upload this tile's textures to the GPU.
    ///
    /// Forces the memory stage (synchronously) and parent residency first.
    /// Allocates one slot per channel the tile owns, pushes the pixels, and
    /// drops the CPU buffers; the GPU is then sole owner of the data. Main
    /// thread only.
    pub fn upload(
        &self,
        slots: &mut dyn TextureSlots,
        source: &dyn TileSource,
        settings: &LoadSettings,
    ) -> Result<(), StreamError> {
        self.load_to_memory(true, source, settings)?;
        if let Some(parent) = self.parent()
            && !parent.is_resident()
        {
            parent.upload(slots, source, settings)?;
        }
        if self.is_resident() {
            return Ok(());
        }

        let mut data = lock_data(&self.data);
        if let Some(pixels) = data.elevation.take() {
            let region = slots.allocate(TextureChannel::Elevation, self.address)?;
            slots.upload(TextureChannel::Elevation, region.slot, &pixels);
            data.elevation_slot = Some(region);
        }
        if let Some(pixels) = data.diffuse.take() {
            let region = slots.allocate(TextureChannel::Diffuse, self.address)?;
            slots.upload(TextureChannel::Diffuse, region.slot, &pixels);
            data.diffuse_slot = Some(region);
        }
        self.resident.store(true, Ordering::Release);
        log::trace!("tile {} resident", self.address);
        Ok(())
    }

    /// Return any held GPU slots to the allocator and clear all state.
    ///
    /// Slots are freed before the buffers drop. Called from eviction on the
    /// main thread.
    pub fn release(&self, slots: &mut dyn TextureSlots) {
        let mut data = lock_data(&self.data);
        if let Some(region) = data.elevation_slot.take() {
            slots.free(TextureChannel::Elevation, region.slot);
        }
        if let Some(region) = data.diffuse_slot.take() {
            slots.free(TextureChannel::Diffuse, region.slot);
        }
        data.elevation = None;
        data.diffuse = None;
        data.heights = None;
        self.resident.store(false, Ordering::Release);
        self.in_memory.store(false, Ordering::Release);
        self.height_revision.fetch_add(1, Ordering::Release);
    }
}

fn range_from(min_max: Option<(u16, u16)>, settings: &LoadSettings) -> Option<HeightRange> {
    min_max.map(|(min_encoded, max_encoded)| HeightRange {
        min_encoded,
        max_encoded,
        min_world: settings.decode_height(min_encoded),
        max_world: settings.decode_height(max_encoded),
    })
}
