//! CPU-side pixel buffers for decoded tile textures.

/// Pixel layout of a tile texture channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single 16-bit channel, used for encoded elevation.
    R16,
    /// Four 8-bit channels, used for diffuse color.
    Rgba8,
}

impl PixelFormat {
    /// Size of one texel in bytes.
    #[must_use]
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            PixelFormat::R16 => 2,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded, CPU-resident square pixel buffer.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw bytes as a pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the dimensions and format. The
    /// decoders that feed this type produce exact-sized buffers; anything
    /// else is a bug, not a runtime condition.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        let expected = (width as usize) * (height as usize) * format.bytes_per_texel() as usize;
        assert_eq!(
            data.len(),
            expected,
            "pixel buffer size mismatch for {width}x{height} {format:?}"
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw bytes, row-major, tightly packed.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read one `R16` texel.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not `R16` or the coordinates are out of range.
    #[must_use]
    pub fn texel_r16(&self, x: u32, y: u32) -> u16 {
        assert_eq!(self.format, PixelFormat::R16, "texel_r16 on {:?}", self.format);
        assert!(x < self.width && y < self.height, "texel ({x}, {y}) out of range");
        let i = 2 * (y as usize * self.width as usize + x as usize);
        u16::from_ne_bytes([self.data[i], self.data[i + 1]])
    }

    /// Min and max `R16` texel value over a sub-rectangle given in
    /// normalized `[0, 1]` texture coordinates. Returns `None` for an empty
    /// rectangle.
    #[must_use]
    pub fn min_max_r16(&self, offset: [f32; 2], scale: f32) -> Option<(u16, u16)> {
        let x0 = (offset[0] * self.width as f32) as u32;
        let y0 = (offset[1] * self.height as f32) as u32;
        let x1 = (((offset[0] + scale) * self.width as f32).ceil() as u32).min(self.width);
        let y1 = (((offset[1] + scale) * self.height as f32).ceil() as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        let mut min = u16::MAX;
        let mut max = u16::MIN;
        for y in y0..y1 {
            for x in x0..x1 {
                let v = self.texel_r16(x, y);
                min = min.min(v);
                max = max.max(v);
            }
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_r16(size: u32) -> PixelBuffer {
        let mut texels = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                texels.push((y * size + x) as u16);
            }
        }
        PixelBuffer::from_raw(size, size, PixelFormat::R16, bytemuck::cast_slice(&texels).to_vec())
    }

    #[test]
    fn test_texel_r16_roundtrip() {
        let buf = gradient_r16(8);
        assert_eq!(buf.texel_r16(0, 0), 0);
        assert_eq!(buf.texel_r16(3, 2), 19);
        assert_eq!(buf.texel_r16(7, 7), 63);
    }

    #[test]
    fn test_min_max_over_full_buffer() {
        let buf = gradient_r16(8);
        assert_eq!(buf.min_max_r16([0.0, 0.0], 1.0), Some((0, 63)));
    }

    #[test]
    fn test_min_max_over_quadrant() {
        let buf = gradient_r16(8);
        // The (+x, +z) quadrant holds rows 4..8, columns 4..8.
        let (min, max) = buf.min_max_r16([0.5, 0.5], 0.5).expect("non-empty window");
        assert_eq!(min, 4 * 8 + 4);
        assert_eq!(max, 63);
    }

    #[test]
    #[should_panic(expected = "size mismatch")]
    fn test_from_raw_rejects_wrong_length() {
        let _ = PixelBuffer::from_raw(4, 4, PixelFormat::Rgba8, vec![0; 10]);
    }
}
