use crate::raster::RasterImage;

/// Global binarization: a pixel becomes white (255) when its intensity is
/// strictly above `threshold`, black (0) otherwise.
///
/// Intensity is the mean of the color channels, which is the gray value
/// itself once the image went through grayscale conversion. Alpha is kept.
pub fn apply(image: &RasterImage, threshold: u8) -> RasterImage {
    image.map_pixels(|[r, g, b, a]| {
        let intensity = (r as u16 + g as u16 + b as u16) as f32 / 3.0;
        let v = if intensity > threshold as f32 { 255 } else { 0 };
        [v, v, v, a]
    })
}
