use crate::preprocessing::GrayscaleStrategy;
use crate::raster::RasterImage;

/// Convert every pixel to a single gray value stored in R, G and B.
/// Alpha is carried over untouched.
pub fn apply(image: &RasterImage, strategy: GrayscaleStrategy) -> RasterImage {
    image.map_pixels(|[r, g, b, a]| {
        let gray = gray_value(r, g, b, strategy);
        [gray, gray, gray, a]
    })
}

/// Gray value of one RGB triple, rounded to the nearest integer
pub fn gray_value(r: u8, g: u8, b: u8, strategy: GrayscaleStrategy) -> u8 {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let gray = match strategy {
        GrayscaleStrategy::LumaWeighted => 0.299 * r + 0.587 * g + 0.114 * b,
        GrayscaleStrategy::ChannelMean => (r + g + b) / 3.0,
    };
    gray.round().clamp(0.0, 255.0) as u8
}
