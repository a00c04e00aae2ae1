//! Collision primitives for terrain culling: spheres, frustum planes, and
//! spherized bounding volumes built from the cube-sphere mapping.

mod frustum;
mod sphere;
mod spherized;

pub use frustum::{Containment, Frustum};
pub use sphere::Sphere;
pub use spherized::{DividedBounds, SpherizedBounds};
