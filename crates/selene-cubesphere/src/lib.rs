//! Cube-sphere geometry: face bases, the face-local-to-sphere mapping, and tile addressing.

mod cube_face;
mod mapping;
mod tile_address;

pub use cube_face::CubeFace;
pub use mapping::{cubify, face_to_cube, map_to_sphere};
pub use tile_address::{TileAddress, TileWindow};
