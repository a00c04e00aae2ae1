//! Bounding spheres.

use glam::DVec3;

/// A sphere in planet-local f64 space (origin at the planet center).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: DVec3,
    /// Radius of the sphere.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere from center and radius.
    #[must_use]
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Returns true if the two spheres overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &Sphere) -> bool {
        let sum = self.radius + other.radius;
        self.center.distance_squared(other.center) <= sum * sum
    }

    /// The interval of distances from the origin covered by this sphere,
    /// clamped at zero when the sphere contains the origin.
    #[must_use]
    pub fn radial_interval(&self) -> (f64, f64) {
        let d = self.center.length();
        ((d - self.radius).max(0.0), d + self.radius)
    }
}
