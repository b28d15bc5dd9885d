//! In-memory RGBA raster shared by every pipeline stage.

use crate::error::OcrError;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// RGBA8 pixel grid, row-major from the top row down.
///
/// The buffer always holds exactly `width * height * 4` bytes. Transforms never
/// mutate a raster they were handed; they build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Wrap a raw RGBA buffer, rejecting buffers whose length does not match
    /// the dimensions
    pub fn from_raw(width: u32, height: u32, buffer: Vec<u8>) -> Result<Self, OcrError> {
        let expected = width as usize * height as usize * 4;
        if buffer.len() != expected {
            return Err(OcrError::InvalidImage(format!(
                "buffer holds {} bytes, expected {} for {}x{} RGBA",
                buffer.len(),
                expected,
                width,
                height
            )));
        }

        let pixels = RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
            OcrError::InvalidImage(format!("cannot build {}x{} raster", width, height))
        })?;
        Ok(Self { pixels })
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        Self {
            pixels: RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y))),
        }
    }

    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(pixel)),
        }
    }

    /// Decode an encoded image (PNG, JPEG, WebP, ...), guessing the format
    /// from its content
    pub fn decode(bytes: &[u8]) -> Result<Self, OcrError> {
        if bytes.is_empty() {
            return Err(OcrError::InvalidImage("image data is empty".to_string()));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| OcrError::InvalidImage(format!("Failed to decode image: {}", e)))?;
        Ok(Self::from(image))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True when the raster has no pixels to work with
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0 || self.pixels.as_raw().is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.pixels.pixels().map(|p| p.0)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Build a same-sized raster by mapping every pixel independently
    pub fn map_pixels<F>(&self, f: F) -> Self
    where
        F: Fn([u8; 4]) -> [u8; 4],
    {
        let mut out = self.pixels.clone();
        for pixel in out.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
        Self { pixels: out }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels.clone())
    }

    /// Encode into the given container format
    pub fn encode(&self, format: ImageFormat) -> Result<Vec<u8>, OcrError> {
        let mut buffer = Vec::new();
        self.to_dynamic()
            .write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|e| OcrError::Internal(format!("Failed to encode image: {}", e)))?;
        Ok(buffer)
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self {
            pixels: image.into_rgba8(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_from_raw_checks_buffer_length() {
        assert!(RasterImage::from_raw(2, 2, vec![0; 16]).is_ok());

        let err = RasterImage::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn test_decode_png_to_rgba() {
        let gray = GrayImage::from_pixel(3, 2, Luma([77]));
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let raster = RasterImage::decode(&png).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(raster.as_raw().len(), 3 * 2 * 4);
        assert_eq!(raster.pixel(2, 1), [77, 77, 77, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = RasterImage::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));

        let err = RasterImage::decode(&[]).unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn test_map_pixels_leaves_source_untouched() {
        let source = RasterImage::filled(4, 4, [10, 20, 30, 255]);
        let mapped = source.map_pixels(|[r, g, b, a]| [255 - r, 255 - g, 255 - b, a]);

        assert_eq!(source.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(mapped.pixel(0, 0), [245, 235, 225, 255]);
    }

    #[test]
    fn test_zero_sized_raster_is_empty() {
        assert!(RasterImage::filled(0, 5, [0, 0, 0, 255]).is_empty());
        assert!(!RasterImage::filled(1, 1, [0, 0, 0, 255]).is_empty());
    }
}
