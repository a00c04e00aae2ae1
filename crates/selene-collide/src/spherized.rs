//! Spherized bounding volumes for cube-face terrain patches.
//!
//! A face-local axis-aligned box, pushed through the cube-sphere mapping,
//! becomes a curved slab. A bounding sphere alone fits such a slab poorly,
//! so [`SpherizedBounds`] keeps three rejection stages: the bounding sphere,
//! the radial (distance-from-origin) interval, and up to four separating
//! axes derived from the mapped side faces. [`DividedBounds`] adds a 2×2×2
//! grid of sub-volumes for tighter culling of large, strongly curved
//! patches.

use glam::DVec3;
use selene_cubesphere::{CubeFace, map_to_sphere};

use crate::{Frustum, Sphere};

const DEGENERATE_EPSILON: f64 = 1e-12;

/// A separating axis with the volume's projection interval along it.
#[derive(Clone, Copy, Debug)]
struct SeparatingAxis {
    normal: DVec3,
    min: f64,
    max: f64,
}

impl SeparatingAxis {
    /// Build an axis from two edge vectors of a mapped side face, with the
    /// projection interval over `points` widened by `margin` on both ends.
    ///
    /// Degenerate edges (or parallel edges) yield `None`: a null axis never
    /// rejects, keeping the test conservative.
    fn from_edges(e1: DVec3, e2: DVec3, points: &[DVec3], margin: f64) -> Option<SeparatingAxis> {
        let normal = e1.cross(e2);
        let len = normal.length();
        if len < DEGENERATE_EPSILON {
            return None;
        }
        let normal = normal / len;
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for point in points {
            let p = normal.dot(*point);
            min = min.min(p);
            max = max.max(p);
        }
        Some(SeparatingAxis {
            normal,
            min: min - margin,
            max: max + margin,
        })
    }

    fn separates_sphere(&self, sphere: &Sphere) -> bool {
        let p = self.normal.dot(sphere.center);
        p + sphere.radius < self.min || p - sphere.radius > self.max
    }
}

/// Bounding volume for one face-local box mapped onto the sphere.
#[derive(Clone, Debug)]
pub struct SpherizedBounds {
    /// Fast-rejection sphere around all mapped corners.
    sphere: Sphere,
    /// Min/max distance-from-origin over the mapped corners.
    radial_min: f64,
    radial_max: f64,
    /// Side-face separating axes (front/right/back/left of the mapped box).
    axes: [Option<SeparatingAxis>; 4],
}

impl SpherizedBounds {
    /// Build bounds from a face-local axis-aligned box.
    ///
    /// `min`/`max` are face-local: x/z in `[0, face_size]`, y is elevation.
    /// The mapped patch bulges past the convex hull of its 8 mapped corners
    /// (an on-surface point strictly inside the footprint can project outside
    /// every corner along a side axis), so the extents come from a 3x3
    /// footprint grid at both elevations, widened by a curvature margin that
    /// covers the bulge between grid samples.
    #[must_use]
    pub fn from_box(min: DVec3, max: DVec3, face: CubeFace, face_size: f64, radius: f64) -> Self {
        // Corner index bits: x = bit 2, y = bit 1, z = bit 0.
        let mut corners = [DVec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let local = DVec3::new(
                if i & 4 != 0 { max.x } else { min.x },
                if i & 2 != 0 { max.y } else { min.y },
                if i & 1 != 0 { max.z } else { min.z },
            );
            *corner = map_to_sphere(local, face, face_size, radius);
        }
        let mid = (min + max) * 0.5;
        let center = map_to_sphere(mid, face, face_size, radius);

        let mut samples = [DVec3::ZERO; 18];
        let mut i = 0;
        for y in [min.y, max.y] {
            for x in [min.x, mid.x, max.x] {
                for z in [min.z, mid.z, max.z] {
                    samples[i] = map_to_sphere(DVec3::new(x, y, z), face, face_size, radius);
                    i += 1;
                }
            }
        }

        let mut hull_radius: f64 = 0.0;
        let mut radial_min = f64::MAX;
        let mut radial_max = f64::MIN;
        for sample in &samples {
            hull_radius = hull_radius.max(center.distance(*sample));
            let r = sample.length();
            radial_min = radial_min.min(r);
            radial_max = radial_max.max(r);
        }
        let margin = curvature_margin(hull_radius, radial_max);

        // One axis per mapped side face; the top/bottom faces are covered by
        // the radial interval instead.
        let axes = [
            // x-min side: edges along z and y from corner (0,0,0).
            SeparatingAxis::from_edges(
                corners[1] - corners[0],
                corners[2] - corners[0],
                &samples,
                margin,
            ),
            // x-max side: edges along z and y from corner (1,0,0).
            SeparatingAxis::from_edges(
                corners[5] - corners[4],
                corners[6] - corners[4],
                &samples,
                margin,
            ),
            // z-min side: edges along x and y from corner (0,0,0).
            SeparatingAxis::from_edges(
                corners[4] - corners[0],
                corners[2] - corners[0],
                &samples,
                margin,
            ),
            // z-max side: edges along x and y from corner (0,0,1).
            SeparatingAxis::from_edges(
                corners[5] - corners[1],
                corners[3] - corners[1],
                &samples,
                margin,
            ),
        ];

        Self {
            sphere: Sphere::new(center, hull_radius + margin),
            radial_min,
            radial_max,
            axes,
        }
    }

    /// The fast-rejection bounding sphere.
    #[must_use]
    pub fn bounding_sphere(&self) -> &Sphere {
        &self.sphere
    }

    /// Sphere collision: bounding-sphere rejection, then radial-interval
    /// rejection, then the side-face separating axes. Any stage that cannot
    /// discriminate simply does not reject.
    #[must_use]
    pub fn intersects_sphere(&self, query: &Sphere) -> bool {
        if !self.sphere.intersects(query) {
            return false;
        }
        let (query_min, query_max) = query.radial_interval();
        if query_max < self.radial_min || query_min > self.radial_max {
            return false;
        }
        for axis in self.axes.iter().flatten() {
            if axis.separates_sphere(query) {
                return false;
            }
        }
        true
    }

    /// Frustum collision, approximated by the bounding sphere only. Cheaper
    /// than the full separation test and conservative in the accept
    /// direction.
    #[must_use]
    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        frustum.intersects_sphere(self.sphere.center, self.sphere.radius)
    }
}

/// Upper bound on how far the mapped patch strays from the convex hull of
/// its grid samples: the sag of a spherical arc spanning one grid cell, with
/// slack for the doubly curved interior.
fn curvature_margin(hull_radius: f64, radial_max: f64) -> f64 {
    if hull_radius >= radial_max {
        return hull_radius;
    }
    let cell_half_angle = (hull_radius / radial_max).asin() * 0.5;
    1.5 * radial_max * (1.0 - cell_half_angle.cos())
}

/// A spherized volume subdivided into a 2×2×2 grid of sub-volumes.
///
/// Large patches curve enough that their single box is a poor fit; a query
/// must hit at least one sub-volume (after passing the main volume) to
/// count as a collision.
#[derive(Clone, Debug)]
pub struct DividedBounds {
    main: SpherizedBounds,
    parts: Box<[SpherizedBounds; 8]>,
}

impl DividedBounds {
    /// Build the main volume plus the 8 sub-volumes over the box octants.
    #[must_use]
    pub fn from_box(min: DVec3, max: DVec3, face: CubeFace, face_size: f64, radius: f64) -> Self {
        let main = SpherizedBounds::from_box(min, max, face, face_size, radius);
        let mid = (min + max) * 0.5;
        let parts = std::array::from_fn(|i| {
            let part_min = DVec3::new(
                if i & 4 != 0 { mid.x } else { min.x },
                if i & 2 != 0 { mid.y } else { min.y },
                if i & 1 != 0 { mid.z } else { min.z },
            );
            let part_max = DVec3::new(
                if i & 4 != 0 { max.x } else { mid.x },
                if i & 2 != 0 { max.y } else { mid.y },
                if i & 1 != 0 { max.z } else { mid.z },
            );
            SpherizedBounds::from_box(part_min, part_max, face, face_size, radius)
        });
        Self {
            main,
            parts: Box::new(parts),
        }
    }

    /// The undivided volume covering the full footprint.
    #[must_use]
    pub fn main(&self) -> &SpherizedBounds {
        &self.main
    }

    /// Sphere collision: reject via the main volume first, then accept if
    /// any sub-volume collides.
    #[must_use]
    pub fn intersects_sphere(&self, query: &Sphere) -> bool {
        if !self.main.intersects_sphere(query) {
            return false;
        }
        self.parts.iter().any(|part| part.intersects_sphere(query))
    }

    /// Frustum collision delegates to the main bounding sphere.
    #[must_use]
    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        self.main.intersects_frustum(frustum)
    }
}
