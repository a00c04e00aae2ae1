//! Face-local to sphere mapping with the cubify warp.
//!
//! A naive cube-to-sphere normalization pinches detail toward face centers.
//! The analytic warp used here (Everitt/Mathworld) spreads cube-surface area
//! nearly uniformly over the sphere, which keeps patch sizes comparable
//! across a face.

use glam::DVec3;

use crate::CubeFace;

/// Place normalized face coordinates `s`, `t` (each in `[-1, 1]`) on the
/// surface of the `[-1, 1]` cube, oriented by `face`.
#[inline]
#[must_use]
pub fn face_to_cube(face: CubeFace, s: f64, t: f64) -> DVec3 {
    face.normal() + s * face.tangent() + t * face.bitangent()
}

/// Warp a point on the cube surface onto the unit sphere with minimal area
/// distortion:
///
/// ```text
/// sx = x * sqrt(1 - y²/2 - z²/2 + y²z²/3)
/// sy = y * sqrt(1 - x²/2 - z²/2 + x²z²/3)
/// sz = z * sqrt(1 - x²/2 - y²/2 + x²y²/3)
/// ```
#[inline]
#[must_use]
pub fn cubify(cube_point: DVec3) -> DVec3 {
    let x2 = cube_point.x * cube_point.x;
    let y2 = cube_point.y * cube_point.y;
    let z2 = cube_point.z * cube_point.z;

    DVec3::new(
        cube_point.x * (1.0 - y2 / 2.0 - z2 / 2.0 + y2 * z2 / 3.0).sqrt(),
        cube_point.y * (1.0 - x2 / 2.0 - z2 / 2.0 + x2 * z2 / 3.0).sqrt(),
        cube_point.z * (1.0 - x2 / 2.0 - y2 / 2.0 + x2 * y2 / 3.0).sqrt(),
    )
}

/// Map a face-local point onto the sphere.
///
/// `point.x` and `point.z` are face-local coordinates in `[0, face_size]`;
/// `point.y` is the elevation above the sphere surface. The result is a
/// world-space position at distance `radius + point.y` from the origin,
/// oriented by `face`.
///
/// Pure function; every bounding-volume construction funnels through it.
#[inline]
#[must_use]
pub fn map_to_sphere(point: DVec3, face: CubeFace, face_size: f64, radius: f64) -> DVec3 {
    let s = 2.0 * point.x / face_size - 1.0;
    let t = 2.0 * point.z / face_size - 1.0;
    cubify(face_to_cube(face, s, t)) * (radius + point.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;
    const FACE_SIZE: f64 = 4096.0;
    const RADIUS: f64 = 100_000.0;

    #[test]
    fn test_face_center_maps_along_normal() {
        for face in CubeFace::ALL {
            let p = DVec3::new(FACE_SIZE * 0.5, 0.0, FACE_SIZE * 0.5);
            let mapped = map_to_sphere(p, face, FACE_SIZE, RADIUS);
            let expected = face.normal() * RADIUS;
            assert!(
                (mapped - expected).length() < EPSILON,
                "face center of {face:?} should map to radius·normal, got {mapped:?}"
            );
        }
    }

    #[test]
    fn test_zero_elevation_lands_on_sphere_surface() {
        for face in CubeFace::ALL {
            for xi in 0..=8 {
                for zi in 0..=8 {
                    let p = DVec3::new(
                        FACE_SIZE * f64::from(xi) / 8.0,
                        0.0,
                        FACE_SIZE * f64::from(zi) / 8.0,
                    );
                    let mapped = map_to_sphere(p, face, FACE_SIZE, RADIUS);
                    assert!(
                        (mapped.length() - RADIUS).abs() < 1e-6,
                        "mapped point not on sphere for {face:?} at ({xi}, {zi}): \
                         length = {}",
                        mapped.length()
                    );
                }
            }
        }
    }

    #[test]
    fn test_elevation_adds_to_radius() {
        let p = DVec3::new(1000.0, 2500.0, 3000.0);
        let mapped = map_to_sphere(p, CubeFace::PosY, FACE_SIZE, RADIUS);
        assert!(
            (mapped.length() - (RADIUS + 2500.0)).abs() < 1e-6,
            "elevation should offset the radial distance, got {}",
            mapped.length()
        );
    }

    #[test]
    fn test_cubify_preserves_cube_corners() {
        // Cube corners map to sphere points along the corner diagonal.
        let corner = DVec3::new(1.0, 1.0, 1.0);
        let warped = cubify(corner);
        assert!((warped.length() - 1.0).abs() < EPSILON);
        assert!((warped.normalize() - corner.normalize()).length() < EPSILON);
    }

    #[test]
    fn test_mapping_continuous_across_shared_edge() {
        // The +X face at x=0 and the +Z face at x=face_size share a cube edge.
        for i in 0..=16 {
            let z = FACE_SIZE * f64::from(i) / 16.0;
            let a = map_to_sphere(DVec3::new(0.0, 0.0, z), CubeFace::PosX, FACE_SIZE, RADIUS);
            let b = map_to_sphere(
                DVec3::new(FACE_SIZE, 0.0, z),
                CubeFace::PosZ,
                FACE_SIZE,
                RADIUS,
            );
            assert!(
                (a - b).length() < 1e-6,
                "edge mismatch at z={z}: {a:?} vs {b:?}"
            );
        }
    }

    #[test]
    fn test_warp_spreads_area_versus_naive_normalization() {
        // Near a face corner, the warped mapping keeps cells larger than the
        // pinched naive normalization does.
        let step = 1.0 / 64.0;
        let corner_a = cubify(face_to_cube(CubeFace::PosY, 1.0 - step, 1.0));
        let corner_b = cubify(face_to_cube(CubeFace::PosY, 1.0, 1.0));
        let warped_cell = (corner_a - corner_b).length();

        let naive_a = face_to_cube(CubeFace::PosY, 1.0 - step, 1.0).normalize();
        let naive_b = face_to_cube(CubeFace::PosY, 1.0, 1.0).normalize();
        let naive_cell = (naive_a - naive_b).length();

        assert!(
            warped_cell > naive_cell,
            "cubify should widen corner cells: warped={warped_cell}, naive={naive_cell}"
        );
    }
}
