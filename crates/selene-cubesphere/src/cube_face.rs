//! The six faces of the terrain cube and their orientation bases.

use glam::DVec3;

/// One of the six cube faces that together tile the sphere.
///
/// Each face carries a fixed orthonormal basis (normal, tangent, bitangent)
/// that orients face-local coordinates in world space. The basis tables are
/// the "six fixed cases" of the cube mapping: every face is an axis
/// permutation with sign flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in canonical order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Canonical index of this face, matching the discriminant.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Direction of increasing face-local `x` on this face.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::NEG_Z,
            CubeFace::NegX => DVec3::Z,
            CubeFace::PosY => DVec3::X,
            CubeFace::NegY => DVec3::X,
            CubeFace::PosZ => DVec3::X,
            CubeFace::NegZ => DVec3::NEG_X,
        }
    }

    /// Direction of increasing face-local `z` on this face.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::Y,
            CubeFace::NegX => DVec3::Y,
            CubeFace::PosY => DVec3::NEG_Z,
            CubeFace::NegY => DVec3::Z,
            CubeFace::PosZ => DVec3::Y,
            CubeFace::NegZ => DVec3::Y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_distinct_faces() {
        assert_eq!(CubeFace::ALL.len(), 6);
        for (i, face) in CubeFace::ALL.iter().enumerate() {
            assert_eq!(face.index(), i, "face {face:?} has unexpected index");
        }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for face in CubeFace::ALL {
            let n = face.normal();
            let t = face.tangent();
            let b = face.bitangent();
            assert!((n.length() - 1.0).abs() < 1e-12, "normal not unit for {face:?}");
            assert!((t.length() - 1.0).abs() < 1e-12, "tangent not unit for {face:?}");
            assert!((b.length() - 1.0).abs() < 1e-12, "bitangent not unit for {face:?}");
            assert!(n.dot(t).abs() < 1e-12, "normal·tangent != 0 for {face:?}");
            assert!(n.dot(b).abs() < 1e-12, "normal·bitangent != 0 for {face:?}");
            assert!(t.dot(b).abs() < 1e-12, "tangent·bitangent != 0 for {face:?}");
        }
    }

    #[test]
    fn test_tangent_cross_bitangent_equals_normal() {
        for face in CubeFace::ALL {
            let cross = face.tangent().cross(face.bitangent());
            assert!(
                (cross - face.normal()).length() < 1e-12,
                "tangent x bitangent != normal for {face:?}"
            );
        }
    }

    #[test]
    fn test_normals_cover_all_axes() {
        let sum: DVec3 = CubeFace::ALL.iter().map(|f| f.normal()).sum();
        assert!(sum.length() < 1e-12, "face normals should cancel pairwise");
    }
}
