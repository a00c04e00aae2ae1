//! View-frustum extraction and conservative sphere classification.
//!
//! Planes are extracted from the view-projection matrix with the
//! Griggs-Hartmann method and normalized at construction time, so every
//! later distance query is a single dot product.

use glam::{DMat4, DVec3, DVec4};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Result of classifying a sphere against the frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    /// Entirely behind at least one plane.
    Outside,
    /// Within the radius of at least one plane; treated as colliding.
    Intersects,
    /// Fully on the interior side of all six planes.
    Inside,
}

/// A view frustum defined by six inward-pointing planes.
///
/// Each plane is `DVec4(a, b, c, d)` where `(a, b, c)` is the unit inward
/// normal and `d` the signed distance term.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract and normalize frustum planes from a combined view-projection
    /// matrix. Works with both perspective and orthographic projections.
    #[must_use]
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[3] + rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Build a frustum directly from six pre-computed planes. Normalizes
    /// each plane so later tests can assume unit normals.
    #[must_use]
    pub fn from_planes(mut planes: [DVec4; 6]) -> Self {
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// Classify a sphere against all six planes.
    ///
    /// Conservative: a sphere within its radius of any plane is reported as
    /// [`Containment::Intersects`], never silently culled.
    #[must_use]
    pub fn classify_sphere(&self, center: DVec3, radius: f64) -> Containment {
        let mut result = Containment::Inside;
        for plane in &self.planes {
            let distance = plane.truncate().dot(center) + plane.w;
            if distance < -radius {
                return Containment::Outside;
            }
            if distance < radius {
                result = Containment::Intersects;
            }
        }
        result
    }

    /// Returns true if the sphere is at least partially inside the frustum.
    #[must_use]
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        self.classify_sphere(center, radius) != Containment::Outside
    }
}
