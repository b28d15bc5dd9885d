use crate::error::OcrError;
use crate::raster::RasterImage;

/// Largest raster the scale step will allocate, in pixels
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Upscale by an integer factor using nearest-neighbor replication.
///
/// Each source pixel becomes a `factor`x`factor` block, so output pixel
/// (x, y) is source pixel (x / factor, y / factor). No smoothing is applied.
/// Output dimensions that overflow or exceed [`MAX_OUTPUT_PIXELS`] are an
/// `InvalidImage` error.
pub fn apply(image: &RasterImage, factor: u32) -> Result<RasterImage, OcrError> {
    let factor = factor.max(1);
    if factor == 1 {
        return Ok(image.clone());
    }

    let (width, height) = image.dimensions();
    let (out_width, out_height) = output_dimensions(width, height, factor)?;
    Ok(RasterImage::from_fn(out_width, out_height, |x, y| {
        image.pixel(x / factor, y / factor)
    }))
}

fn output_dimensions(width: u32, height: u32, factor: u32) -> Result<(u32, u32), OcrError> {
    let too_large = || {
        OcrError::InvalidImage(format!(
            "{}x{} image scaled by {} exceeds {} pixels",
            width, height, factor, MAX_OUTPUT_PIXELS
        ))
    };

    let out_width = width.checked_mul(factor).ok_or_else(too_large)?;
    let out_height = height.checked_mul(factor).ok_or_else(too_large)?;
    if u64::from(out_width) * u64::from(out_height) > MAX_OUTPUT_PIXELS {
        return Err(too_large());
    }
    Ok((out_width, out_height))
}
