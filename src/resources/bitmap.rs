use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::errors::{Result, SkinError};
use crate::utils::color;

/// CPU-side RGBA bitmap with packed `u32` pixels (red in the low byte).
///
/// Used for decoded part textures, painting canvases and the pixel buffers
/// mirrored by texture atlas allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    /// Creates a fully transparent (zeroed) bitmap.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, color: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width as usize) * (height as usize)],
        }
    }

    /// Wraps existing pixels. The pixel vector is resized to `width * height`,
    /// padding with transparent pixels when short.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, mut pixels: Vec<u32>) -> Self {
        let len = (width as usize) * (height as usize);
        if pixels.len() != len {
            log::warn!(
                "Bitmap pixel count {} does not match {}x{}, resizing",
                pixels.len(),
                width,
                height
            );
            pixels.resize(len, 0);
        }
        Self { width, height, pixels }
    }

    /// Builds a bitmap from raw RGBA bytes (4 bytes per pixel, row-major).
    #[must_use]
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Self {
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| color::pack_rgba(c[0], c[1], c[2], c[3]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Decodes a PNG image.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba_bytes(width, height, img.as_raw()))
    }

    /// Encodes the bitmap as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let img = RgbaImage::from_raw(self.width, self.height, self.to_rgba_bytes())
            .ok_or_else(|| SkinError::ImageError("pixel buffer size mismatch".into()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: u32) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = value;
        }
    }

    pub fn fill(&mut self, value: u32) {
        self.pixels.fill(value);
    }

    /// Multiplies every pixel's RGB by `tint` in place (alpha unchanged).
    pub fn multiply_rgb(&mut self, tint: u32) {
        for p in &mut self.pixels {
            *p = color::multiply_rgb(*p, tint);
        }
    }
}
