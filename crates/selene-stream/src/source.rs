//! Addressable tile sources.
//!
//! A source maps a tile address to decoded pixel data, independently for
//! the elevation and diffuse channels, at fixed per-channel dimensions.

use std::path::{Path, PathBuf};

use image::ImageReader;
use selene_config::StreamingSettings;
use selene_cubesphere::TileAddress;

use crate::{PixelBuffer, PixelFormat, StreamError};

/// Decodes tile textures by address. Implementations are called from worker
/// threads and from the main thread concurrently.
pub trait TileSource: Send + Sync {
    /// Edge length in texels of every elevation tile.
    fn elevation_size(&self) -> u32;

    /// Edge length in texels of every diffuse tile.
    fn diffuse_size(&self) -> u32;

    /// Decode the elevation tile at `address` as `R16`.
    fn load_elevation(&self, address: TileAddress) -> Result<PixelBuffer, StreamError>;

    /// Decode the diffuse tile at `address` as `Rgba8`.
    fn load_diffuse(&self, address: TileAddress) -> Result<PixelBuffer, StreamError>;
}

/// Tile source reading PNG tiles from a directory tree.
///
/// Layout: `<root>/<channel>/<face>/<level>/<x>_<z>.png` where `channel` is
/// `elevation` or `diffuse` and `face` is the face index `0..6`.
pub struct DiskTileSource {
    root: PathBuf,
    elevation_size: u32,
    diffuse_size: u32,
}

impl DiskTileSource {
    /// Create a source rooted at `root` with fixed per-channel tile sizes.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, elevation_size: u32, diffuse_size: u32) -> Self {
        Self {
            root: root.into(),
            elevation_size,
            diffuse_size,
        }
    }

    /// Create a source rooted at `root` with the configured tile sizes.
    #[must_use]
    pub fn from_config(root: impl Into<PathBuf>, streaming: &StreamingSettings) -> Self {
        Self::new(
            root,
            streaming.elevation_tile_size,
            streaming.diffuse_tile_size,
        )
    }

    /// The on-disk path of a tile.
    #[must_use]
    pub fn tile_path(&self, channel: &str, address: TileAddress) -> PathBuf {
        self.root
            .join(channel)
            .join(address.face.index().to_string())
            .join(address.level.to_string())
            .join(format!("{}_{}.png", address.x, address.z))
    }

    fn decode(
        &self,
        path: &Path,
        address: TileAddress,
        format: PixelFormat,
        expected: u32,
    ) -> Result<PixelBuffer, StreamError> {
        let reader = ImageReader::open(path).map_err(|source| StreamError::TileRead {
            address,
            source,
        })?;
        let img = reader
            .decode()
            .map_err(|source| StreamError::TileDecode { address, source })?;
        if img.width() != expected || img.height() != expected {
            return Err(StreamError::TileSizeMismatch {
                address,
                expected,
                actual_width: img.width(),
                actual_height: img.height(),
            });
        }
        let bytes = match format {
            PixelFormat::R16 => bytemuck::cast_slice(&img.into_luma16().into_raw()).to_vec(),
            PixelFormat::Rgba8 => img.into_rgba8().into_raw(),
        };
        Ok(PixelBuffer::from_raw(expected, expected, format, bytes))
    }
}

impl TileSource for DiskTileSource {
    fn elevation_size(&self) -> u32 {
        self.elevation_size
    }

    fn diffuse_size(&self) -> u32 {
        self.diffuse_size
    }

    fn load_elevation(&self, address: TileAddress) -> Result<PixelBuffer, StreamError> {
        let path = self.tile_path("elevation", address);
        self.decode(&path, address, PixelFormat::R16, self.elevation_size)
    }

    fn load_diffuse(&self, address: TileAddress) -> Result<PixelBuffer, StreamError> {
        let path = self.tile_path("diffuse", address);
        self.decode(&path, address, PixelFormat::Rgba8, self.diffuse_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_cubesphere::CubeFace;

    fn write_png_r16(path: &Path, size: u32, value: u16) {
        std::fs::create_dir_all(path.parent().expect("tile path has a parent"))
            .expect("create tile directory");
        let img = image::ImageBuffer::from_pixel(size, size, image::Luma([value]));
        image::DynamicImage::ImageLuma16(img)
            .save(path)
            .expect("write elevation tile");
    }

    fn write_png_rgba(path: &Path, size: u32) {
        std::fs::create_dir_all(path.parent().expect("tile path has a parent"))
            .expect("create tile directory");
        let img = image::ImageBuffer::from_pixel(size, size, image::Rgba([10u8, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(img)
            .save(path)
            .expect("write diffuse tile");
    }

    #[test]
    fn test_disk_source_decodes_elevation_tile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = DiskTileSource::new(dir.path(), 16, 16);
        let address = TileAddress::new(CubeFace::PosY, 3, 1, 2);
        write_png_r16(&source.tile_path("elevation", address), 16, 12345);

        let buf = source.load_elevation(address).expect("decode succeeds");
        assert_eq!(buf.width(), 16);
        assert_eq!(buf.format(), PixelFormat::R16);
        assert_eq!(buf.texel_r16(5, 5), 12345);
    }

    #[test]
    fn test_disk_source_decodes_diffuse_tile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = DiskTileSource::new(dir.path(), 16, 8);
        let address = TileAddress::new(CubeFace::NegX, 2, 0, 3);
        write_png_rgba(&source.tile_path("diffuse", address), 8);

        let buf = source.load_diffuse(address).expect("decode succeeds");
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.format(), PixelFormat::Rgba8);
        assert_eq!(&buf.bytes()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_from_config_uses_configured_tile_sizes() {
        let streaming = StreamingSettings {
            elevation_tile_size: 64,
            diffuse_tile_size: 32,
            ..StreamingSettings::default()
        };
        let source = DiskTileSource::from_config("/tiles", &streaming);
        assert_eq!(source.elevation_size(), 64);
        assert_eq!(source.diffuse_size(), 32);
    }

    #[test]
    fn test_missing_tile_reports_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = DiskTileSource::new(dir.path(), 16, 16);
        let address = TileAddress::new(CubeFace::PosX, 1, 0, 0);
        let err = source.load_elevation(address).expect_err("missing file");
        assert!(matches!(err, StreamError::TileRead { .. }), "got {err:?}");
    }

    #[test]
    fn test_wrong_dimensions_reports_size_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = DiskTileSource::new(dir.path(), 32, 32);
        let address = TileAddress::new(CubeFace::PosY, 0, 0, 0);
        write_png_r16(&source.tile_path("elevation", address), 16, 0);

        let err = source.load_elevation(address).expect_err("wrong size");
        match err {
            StreamError::TileSizeMismatch {
                expected,
                actual_width,
                ..
            } => {
                assert_eq!(expected, 32);
                assert_eq!(actual_width, 16);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }
}
