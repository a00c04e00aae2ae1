//! Texture resolution: walking a node's ancestor chain to pick the texture
//! each channel renders with this frame.
//!
//! Each channel has a hop threshold below which a tile's texture is too
//! fine to use. From the first allowed ancestor downward-to-root: a
//! resident supplier wins, a decoded-but-not-uploaded supplier is uploaded
//! on the spot, and a cold supplier gets a background decode queued while
//! the walk falls through to the next ancestor. The root is the backstop;
//! it is loaded and uploaded synchronously if missing, so every channel
//! always resolves.

use std::sync::Arc;

use selene_cubesphere::TileAddress;
use selene_stream::{LoadSettings, SlotRegion, TaskPool, TextureSlots, TileSource, TileTextures};

use crate::{SlotBinding, StreamedTextureBinding, TerrainError, TextureBinding};

/// Per-channel ancestor-hop thresholds.
///
/// A channel may only use textures at least this many ancestors above the
/// visited node; normals need coarser data than geometry, and diffuse runs
/// on its own ladder.
#[derive(Clone, Copy, Debug)]
pub struct HopThresholds {
    /// Hops before elevation may drive vertex displacement.
    pub geometry: u8,
    /// Hops before elevation may drive normal reconstruction.
    pub normal: u8,
    /// Hops before diffuse color may be used.
    pub diffuse: u8,
}

/// Which cached texture a channel reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Elevation,
    Diffuse,
}

/// Shared collaborators for one frame's resolution calls.
pub(crate) struct ResolveContext<'a> {
    pub source: &'a Arc<dyn TileSource>,
    pub slots: &'a mut dyn TextureSlots,
    pub pool: &'a TaskPool,
    pub load: LoadSettings,
    pub hops: HopThresholds,
}

/// Resolve all three channels for the node owning `record`.
///
/// Side effects: may upload decoded ancestors, may queue one background
/// decode per cold ancestor visited (deduplicated by the pool), and forces
/// the root synchronously when it has to supply a channel.
pub(crate) fn resolve_textures(
    record: &Arc<TileTextures>,
    ctx: &mut ResolveContext<'_>,
) -> Result<StreamedTextureBinding, TerrainError> {
    let node = record.address();
    let mut geometry: Option<TextureBinding> = None;
    let mut normal: Option<TextureBinding> = None;
    let mut diffuse: Option<TextureBinding> = None;

    let mut hop: u8 = 0;
    let mut cursor = Some(Arc::clone(record));
    while let Some(supplier) = cursor {
        let is_root = supplier.parent().is_none();
        if geometry.is_none() && (hop >= ctx.hops.geometry || is_root) {
            geometry = try_supply(&node, &supplier, Channel::Elevation, is_root, ctx)?;
        }
        if normal.is_none() && (hop >= ctx.hops.normal || is_root) {
            normal = try_supply(&node, &supplier, Channel::Elevation, is_root, ctx)?;
        }
        if diffuse.is_none() && (hop >= ctx.hops.diffuse || is_root) {
            diffuse = try_supply(&node, &supplier, Channel::Diffuse, is_root, ctx)?;
        }
        if geometry.is_some() && normal.is_some() && diffuse.is_some() {
            break;
        }
        hop = hop.saturating_add(1);
        cursor = supplier.parent();
    }

    Ok(StreamedTextureBinding {
        geometry: settle(geometry, &node, "geometry"),
        normal: settle(normal, &node, "normal"),
        diffuse: settle(diffuse, &node, "diffuse"),
    })
}

/// The root always supplies unresolved channels, so a miss here means the
/// configuration gives the root no texture of its own.
fn settle(binding: Option<TextureBinding>, node: &TileAddress, channel: &str) -> TextureBinding {
    binding.unwrap_or_else(|| {
        log::error!("no {channel} texture resolvable for tile {node}; root owns none");
        let zero = SlotBinding {
            slot: 0,
            offset: [0.0, 0.0],
            size: 1.0,
        };
        TextureBinding {
            current: zero,
            next: zero,
        }
    })
}

fn region_of(record: &TileTextures, channel: Channel) -> Option<SlotRegion> {
    match channel {
        Channel::Elevation => record.elevation_region(),
        Channel::Diffuse => record.diffuse_region(),
    }
}

/// Try to supply one channel from `supplier`.
///
/// Returns `Ok(None)` when the supplier cannot serve this frame; the caller
/// falls through to the next ancestor.
fn try_supply(
    node: &TileAddress,
    supplier: &Arc<TileTextures>,
    channel: Channel,
    is_root: bool,
    ctx: &mut ResolveContext<'_>,
) -> Result<Option<TextureBinding>, TerrainError> {
    let owns = match channel {
        Channel::Elevation => supplier.owns_elevation(&ctx.load),
        Channel::Diffuse => supplier.owns_diffuse(&ctx.load),
    };
    if !owns {
        return Ok(None);
    }

    if !supplier.is_resident() {
        if supplier.is_in_memory() || is_root {
            supplier.upload(ctx.slots, ctx.source.as_ref(), &ctx.load)?;
        } else {
            enqueue_decode(supplier, ctx);
            return Ok(None);
        }
    }

    let Some(current_region) = region_of(supplier, channel) else {
        return Ok(None);
    };
    let Some(window) = node.window_in(&supplier.address()) else {
        return Ok(None);
    };
    let current = SlotBinding::compose(current_region, window);

    // "Next" is the parent's texture, one step coarser. An owning tile's
    // ancestors all own the channel, and a resident tile's ancestors are all
    // resident, so the lookup only misses at the root.
    let next = supplier
        .parent()
        .and_then(|parent| {
            let region = region_of(&parent, channel)?;
            let window = node.window_in(&parent.address())?;
            Some(SlotBinding::compose(region, window))
        })
        .unwrap_or(current);

    Ok(Some(TextureBinding { current, next }))
}

/// Queue an asynchronous decode of `supplier` at its own LOD level, so
/// coarser tiles preempt finer ones. The pool collapses duplicates.
fn enqueue_decode(supplier: &Arc<TileTextures>, ctx: &ResolveContext<'_>) {
    let address = supplier.address();
    let record = Arc::clone(supplier);
    let source = Arc::clone(ctx.source);
    let load = ctx.load;
    ctx.pool.submit(address, address.level, move || {
        // Failures are recoverable here: the node keeps rendering with
        // ancestor data and selection retries on a later frame.
        if let Err(e) = record.load_to_memory(false, source.as_ref(), &load) {
            log::warn!("background decode of tile {address} failed: {e}");
        }
    });
}
