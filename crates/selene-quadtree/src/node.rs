//! Quadtree node: per-patch selection, texture resolution, and aging.

use glam::DVec3;
use std::sync::Arc;

use selene_collide::{DividedBounds, Frustum, Sphere};
use selene_cubesphere::{CubeFace, TileAddress};
use selene_stream::{TextureSlots, TileTextures};

use crate::render_list::{PatchEntry, QuadrantMask, RenderList, StreamedTextureBinding};
use crate::resolve::{ResolveContext, resolve_textures};
use crate::TerrainError;

/// Per-tree constants shared by every node of a face quadtree.
#[derive(Clone, Copy, Debug)]
pub struct TreeParams {
    /// Face edge length in face-local units.
    pub face_size: f64,
    /// Planet radius in world units.
    pub radius: f64,
    /// Culling sphere radius for level-0 geometry; doubles per level.
    pub leaf_distance: f64,
    /// Nodes are never subdivided below this level.
    pub min_subdivision_level: u8,
}

/// Everything one frame's selection pass needs.
pub(crate) struct SelectContext<'a> {
    pub camera: DVec3,
    pub frustum: &'a Frustum,
    pub params: &'a TreeParams,
    pub resolve: ResolveContext<'a>,
    pub list: &'a mut RenderList,
}

/// One square patch of one cube face at one LOD level.
///
/// Owns its four children exclusively; exactly one node exists per tile
/// address reachable through the tree. The texture record is shared with
/// in-flight decode workers through an `Arc`.
pub struct TerrainNode {
    address: TileAddress,
    /// Face-local minimum corner of the footprint.
    offset: [f64; 2],
    /// Footprint edge length in face-local units.
    size: f64,
    bounds: DividedBounds,
    /// The height interval the bounds were built from; rebuilt lazily when
    /// the effective heights change.
    bounds_heights: (f64, f64),
    age: u32,
    visited: bool,
    textures: Arc<TileTextures>,
    children: [Option<Box<TerrainNode>>; 4],
}

impl TerrainNode {
    fn new(
        address: TileAddress,
        offset: [f64; 2],
        size: f64,
        textures: Arc<TileTextures>,
        params: &TreeParams,
    ) -> Self {
        let heights = heights_of(&textures);
        let bounds = build_bounds(address.face, offset, size, heights, params);
        Self {
            address,
            offset,
            size,
            bounds,
            bounds_heights: heights,
            age: 0,
            visited: false,
            textures,
            children: [None, None, None, None],
        }
    }

    /// Create the root node of one face quadtree.
    #[must_use]
    pub fn new_root(face: CubeFace, root_level: u8, params: &TreeParams) -> Self {
        let address = TileAddress::new(face, root_level, 0, 0);
        let textures = TileTextures::new_root(address);
        Self::new(address, [0.0, 0.0], params.face_size, textures, params)
    }

    /// The tile this node covers.
    #[must_use]
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// Frames since this node was last visited by selection.
    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    /// The node's texture cache record.
    #[must_use]
    pub fn textures(&self) -> &Arc<TileTextures> {
        &self.textures
    }

    /// The child covering quadrant `q`, if it has been created.
    #[must_use]
    pub fn child(&self, q: usize) -> Option<&TerrainNode> {
        self.children.get(q).and_then(|c| c.as_deref())
    }

    /// Rebuild the bounding volume if the effective height interval moved.
    fn refresh_bounds(&mut self, params: &TreeParams) {
        let heights = heights_of(&self.textures);
        if heights != self.bounds_heights {
            self.bounds = build_bounds(self.address.face, self.offset, self.size, heights, params);
            self.bounds_heights = heights;
        }
    }

    fn ensure_child(&mut self, q: usize, params: &TreeParams) {
        if self.children[q].is_some() {
            return;
        }
        let address = self.address.child(q);
        let half = self.size * 0.5;
        let offset = [
            self.offset[0] + if q & 1 != 0 { half } else { 0.0 },
            self.offset[1] + if q & 2 != 0 { half } else { 0.0 },
        ];
        let textures = TileTextures::new_child(&self.textures, address);
        self.children[q] = Some(Box::new(Self::new(address, offset, half, textures, params)));
    }

    fn entry(&self, quadrants: QuadrantMask, textures: StreamedTextureBinding) -> PatchEntry {
        PatchEntry {
            face: self.address.face,
            level: self.address.level,
            offset: self.offset,
            size: self.size,
            quadrants,
            textures,
        }
    }

    /// Recursive CDLOD selection, re-run every frame.
    ///
    /// A node's geometry is detailed enough only within a camera sphere
    /// whose radius doubles per level. Outside that sphere (or at the
    /// minimum level) the node is a selection leaf; inside it, detail is
    /// delegated to the colliding children and the node renders only the
    /// ring of quadrants no child covers, so LOD boundaries neither overlap
    /// nor leave gaps.
    pub(crate) fn select(&mut self, ctx: &mut SelectContext<'_>) -> Result<(), TerrainError> {
        self.visited = true;
        self.age = 0;

        // Resolution runs even when this node ends up frustum-culled:
        // visible neighbors depend on this node's texture LOD being settled,
        // or texture seams appear along their shared edge.
        let textures = resolve_textures(&self.textures, &mut ctx.resolve)?;
        self.refresh_bounds(ctx.params);

        let cull_radius = ctx.params.leaf_distance * 2f64.powi(i32::from(self.address.level));
        let cull = Sphere::new(ctx.camera, cull_radius);

        let is_leaf = self.address.level <= ctx.params.min_subdivision_level
            || !self.bounds.intersects_sphere(&cull);
        if is_leaf {
            if self.bounds.intersects_frustum(ctx.frustum) {
                ctx.list.push(self.entry(QuadrantMask::FULL, textures))?;
            }
            return Ok(());
        }

        let mut covered = QuadrantMask::EMPTY;
        for q in 0..4 {
            self.ensure_child(q, ctx.params);
            let Some(child) = &mut self.children[q] else {
                continue;
            };
            child.refresh_bounds(ctx.params);
            if child.bounds.intersects_sphere(&cull) {
                child.select(ctx)?;
                covered.set(q);
            }
        }

        if self.bounds.intersects_frustum(ctx.frustum) {
            let ring = covered.complement();
            if !ring.is_empty() {
                ctx.list.push(self.entry(ring, textures))?;
            }
        }
        Ok(())
    }

    /// Age every child, evicting subtrees whose age exceeds `ttl`.
    ///
    /// Called once per frame after selection. A child visited this frame
    /// keeps age zero; any other child ages by one. Eviction is
    /// unconditional once the TTL is exceeded and releases the subtree's
    /// GPU slots (children first) before dropping it.
    pub(crate) fn age_children(&mut self, ttl: u32, slots: &mut dyn TextureSlots) {
        for slot in &mut self.children {
            let evict = match slot {
                Some(child) => {
                    if child.visited {
                        child.visited = false;
                        false
                    } else {
                        child.age += 1;
                        child.age > ttl
                    }
                }
                None => false,
            };
            if evict {
                if let Some(mut child) = slot.take() {
                    log::debug!("evicting tile {} subtree", child.address);
                    child.release_subtree(slots);
                }
            } else if let Some(child) = slot {
                child.age_children(ttl, slots);
            }
        }
    }

    fn release_subtree(&mut self, slots: &mut dyn TextureSlots) {
        for slot in &mut self.children {
            if let Some(child) = slot {
                child.release_subtree(slots);
            }
        }
        self.textures.release(slots);
    }
}

/// The node's effective height interval: its own record's range, or the
/// nearest ancestor's, or zero before anything has loaded.
fn heights_of(textures: &Arc<TileTextures>) -> (f64, f64) {
    let mut cursor = Some(Arc::clone(textures));
    while let Some(record) = cursor {
        if let Some(heights) = record.heights() {
            return (heights.min_world, heights.max_world);
        }
        cursor = record.parent();
    }
    (0.0, 0.0)
}

fn build_bounds(
    face: CubeFace,
    offset: [f64; 2],
    size: f64,
    heights: (f64, f64),
    params: &TreeParams,
) -> DividedBounds {
    DividedBounds::from_box(
        DVec3::new(offset[0], heights.0, offset[1]),
        DVec3::new(offset[0] + size, heights.1, offset[1] + size),
        face,
        params.face_size,
        params.radius,
    )
}
