//! Decoding of images handed over by the capture side (camera or file picker).

use crate::error::OcrError;
use crate::raster::RasterImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Opaque blob delivered by the capture capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawImage {
    /// Encoded image bytes (PNG, JPEG, ...)
    Encoded(Vec<u8>),
    /// `data:<mime>;base64,<payload>` URI as produced by browser file readers
    DataUri(String),
}

impl RawImage {
    /// Size of the blob as delivered
    pub fn len(&self) -> usize {
        match self {
            RawImage::Encoded(bytes) => bytes.len(),
            RawImage::DataUri(uri) => uri.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate size of the encoded image once base64 is undone
    pub fn payload_len(&self) -> usize {
        match self {
            RawImage::Encoded(bytes) => bytes.len(),
            RawImage::DataUri(uri) => {
                let payload = uri.split_once(',').map(|(_, p)| p).unwrap_or_default();
                payload.trim().len() / 4 * 3
            }
        }
    }

    /// Decode into an RGBA raster
    pub fn decode(&self) -> Result<RasterImage, OcrError> {
        match self {
            RawImage::Encoded(bytes) => RasterImage::decode(bytes),
            RawImage::DataUri(uri) => RasterImage::decode(&decode_data_uri(uri)?),
        }
    }
}

/// Extract the payload bytes of a base64 `data:` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, OcrError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| OcrError::InvalidImage("not a data URI".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| OcrError::InvalidImage("data URI has no payload".to_string()))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !mime.is_empty() && !mime.starts_with("image/") {
        return Err(OcrError::InvalidImage(format!(
            "data URI is not an image: {}",
            mime
        )));
    }
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(OcrError::InvalidImage(
            "data URI payload must be base64".to_string(),
        ));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| OcrError::InvalidImage(format!("Invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 3, Rgba([200, 100, 50, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_data_uri_decodes_to_raster() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes()));
        let raster = RawImage::DataUri(uri).decode().unwrap();
        assert_eq!(raster.dimensions(), (2, 3));
        assert_eq!(raster.pixel(1, 2), [200, 100, 50, 255]);
    }

    #[test]
    fn test_encoded_bytes_decode_to_raster() {
        let raster = RawImage::Encoded(png_bytes()).decode().unwrap();
        assert_eq!(raster.dimensions(), (2, 3));
    }

    #[test]
    fn test_rejects_non_image_data_uri() {
        let err = decode_data_uri("data:text/plain;base64,aGVsbG8=").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_percent_encoded_data_uri() {
        let err = decode_data_uri("data:image/png,%89PNG").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_plain_string() {
        assert!(decode_data_uri("hello").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_payload_len_estimates_decoded_size() {
        let bytes = png_bytes();
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let estimate = RawImage::DataUri(uri).payload_len();
        assert!(estimate >= bytes.len() && estimate <= bytes.len() + 2);
        assert_eq!(RawImage::Encoded(bytes.clone()).payload_len(), bytes.len());
    }
}
