//! Unique tile identifier on the cube-sphere.

use crate::CubeFace;

/// Uniquely identifies a terrain tile.
///
/// - `face`: which of the 6 cube faces the tile belongs to.
/// - `level`: level of detail. The root of each face quadtree has the
///   *maximum* level; each subdivision decreases it by one, so leaves carry
///   the smallest levels. A tile's footprint is proportional to `2^level`.
/// - `x`, `z`: grid coordinates within the face at this level. At a level
///   `d` steps below the root, the face is a `2^d × 2^d` grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Which cube face this tile belongs to.
    pub face: CubeFace,
    /// Level of detail (root = maximum, leaves = smallest).
    pub level: u8,
    /// Horizontal grid coordinate within the face at this level.
    pub x: u32,
    /// Vertical grid coordinate within the face at this level.
    pub z: u32,
}

/// The sub-rectangle of an ancestor tile's texture that covers a descendant.
///
/// `offset` is the top-left corner and `scale` the edge length, both in the
/// ancestor's normalized `[0, 1]` texture space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileWindow {
    /// Top-left corner in the ancestor's texture space.
    pub offset: [f32; 2],
    /// Edge length in the ancestor's texture space.
    pub scale: f32,
}

impl TileWindow {
    /// The window covering an entire tile.
    pub const FULL: TileWindow = TileWindow {
        offset: [0.0, 0.0],
        scale: 1.0,
    };
}

impl TileAddress {
    /// Construct a tile address.
    #[must_use]
    pub fn new(face: CubeFace, level: u8, x: u32, z: u32) -> Self {
        Self { face, level, x, z }
    }

    /// The parent tile one level coarser. The caller is responsible for not
    /// walking past the root level of its tree.
    #[must_use]
    pub fn parent(&self) -> TileAddress {
        TileAddress {
            face: self.face,
            level: self.level + 1,
            x: self.x / 2,
            z: self.z / 2,
        }
    }

    /// The four child tiles one level finer, ordered
    /// `[(-x,-z), (+x,-z), (-x,+z), (+x,+z)]`.
    ///
    /// Returns `None` at level 0 (nothing finer exists).
    #[must_use]
    pub fn children(&self) -> Option<[TileAddress; 4]> {
        if self.level == 0 {
            return None;
        }
        Some([0, 1, 2, 3].map(|q| self.child(q)))
    }

    /// The child tile for quadrant `q` (bit 0 = +x half, bit 1 = +z half).
    ///
    /// # Panics
    ///
    /// Panics if `q >= 4` or this tile is at level 0.
    #[must_use]
    pub fn child(&self, q: usize) -> TileAddress {
        assert!(q < 4, "quadrant {q} out of range");
        assert!(self.level > 0, "tile {self} has no children");
        TileAddress {
            face: self.face,
            level: self.level - 1,
            x: self.x * 2 + (q as u32 & 1),
            z: self.z * 2 + (q as u32 >> 1),
        }
    }

    /// Returns true if `ancestor` is this tile or one of its ancestors.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &TileAddress) -> bool {
        if ancestor.face != self.face || ancestor.level < self.level {
            return false;
        }
        let d = ancestor.level - self.level;
        self.x >> d == ancestor.x && self.z >> d == ancestor.z
    }

    /// The sub-rectangle of `ancestor`'s texture covering this tile.
    ///
    /// Returns `None` if `ancestor` is not actually an ancestor of (or equal
    /// to) this tile.
    #[must_use]
    pub fn window_in(&self, ancestor: &TileAddress) -> Option<TileWindow> {
        if !self.is_descendant_of(ancestor) {
            return None;
        }
        let d = ancestor.level - self.level;
        let scale = 0.5f32.powi(i32::from(d));
        let local_x = self.x - (ancestor.x << d);
        let local_z = self.z - (ancestor.z << d);
        Some(TileWindow {
            offset: [local_x as f32 * scale, local_z as f32 * scale],
            scale,
        })
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?}, level={}, x={}, z={})",
            self.face, self.level, self.x, self.z
        )
    }
}
