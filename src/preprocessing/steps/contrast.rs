use crate::raster::RasterImage;

/// Mid-gray pivot of the contrast stretch
const PIVOT: f32 = 128.0;

/// Stretch contrast around mid-gray.
///
/// `factor = 259 * (c + 255) / (255 * (259 - c))` and each color channel becomes
/// `factor * (v - 128) + 128`, rounded and clamped to the byte range. Larger
/// coefficients push mid-tones toward black and white, which evens out
/// photographed lighting before binarization.
pub fn apply(image: &RasterImage, coefficient: f32) -> RasterImage {
    let factor = contrast_factor(coefficient);
    image.map_pixels(|[r, g, b, a]| {
        [
            stretch(r, factor),
            stretch(g, factor),
            stretch(b, factor),
            a,
        ]
    })
}

/// Slope applied around the pivot for a given coefficient.
/// Coefficient 0 yields exactly 1.0.
pub fn contrast_factor(coefficient: f32) -> f32 {
    (259.0 * (coefficient + 255.0)) / (255.0 * (259.0 - coefficient))
}

fn stretch(value: u8, factor: f32) -> u8 {
    let enhanced = factor * (value as f32 - PIVOT) + PIVOT;
    enhanced.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_coefficient_is_identity() {
        assert!((contrast_factor(0.0) - 1.0).abs() < f32::EPSILON);

        let img = RasterImage::from_fn(16, 16, |x, y| {
            let v = (x * 16 + y) as u8;
            [v, v, v, 255]
        });
        assert_eq!(apply(&img, 0.0), img);
    }

    #[test]
    fn test_positive_coefficient_steepens_slope() {
        assert!(contrast_factor(1.5) > 1.0);
        assert!(contrast_factor(100.0) > contrast_factor(1.5));
    }

    #[test]
    fn test_pivot_is_fixed_point() {
        let img = RasterImage::filled(2, 2, [128, 128, 128, 255]);
        let result = apply(&img, 120.0);
        assert_eq!(result.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn test_midtones_move_toward_extremes() {
        let img = RasterImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                [100, 100, 100, 255]
            } else {
                [160, 160, 160, 255]
            }
        });
        let result = apply(&img, 80.0);

        assert!(result.pixel(0, 0)[0] < 100);
        assert!(result.pixel(1, 0)[0] > 160);
    }

    #[test]
    fn test_output_is_clamped() {
        let img = RasterImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                [5, 5, 5, 255]
            } else {
                [250, 250, 250, 255]
            }
        });
        let result = apply(&img, 250.0);

        assert_eq!(result.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(result.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_alpha_untouched() {
        let img = RasterImage::filled(1, 1, [30, 40, 50, 77]);
        assert_eq!(apply(&img, 1.5).pixel(0, 0)[3], 77);
    }
}
