//! Page images handed to remote vision models as `data:` URLs.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageResult};
use serde::{Deserialize, Serialize};

/// JPEG quality used when re-encoding decoded images.
const JPEG_QUALITY: u8 = 90;

/// An image as a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSource {
    url: String,
}

impl ImageSource {
    /// Wrap encoded image bytes, detecting the format from their signature.
    pub fn from_bytes(bytes: &[u8]) -> ImageResult<Self> {
        let format = image::guess_format(bytes)?;
        Ok(Self::encode(format.to_mime_type(), bytes))
    }

    /// Wrap bytes that are already a JPEG stream.
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self::encode("image/jpeg", bytes)
    }

    /// Re-encode a decoded image as JPEG.
    pub fn from_image(image: &DynamicImage) -> ImageResult<Self> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&rgb)?;
        Ok(Self::from_jpeg(&buffer))
    }

    /// Accept an existing `data:` URL.
    pub fn from_data_url(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        (url.starts_with("data:image/") && url.contains(";base64,")).then_some(Self { url })
    }

    fn encode(mime: &str, bytes: &[u8]) -> Self {
        Self {
            url: format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes)),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.url
    }

    /// MIME type declared in the URL.
    pub fn mime_type(&self) -> &str {
        self.url
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_from_bytes_detects_png() {
        let source = ImageSource::from_bytes(&png_bytes()).unwrap();
        assert!(source.data_url().starts_with("data:image/png;base64,"));
        assert_eq!(source.mime_type(), "image/png");
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(ImageSource::from_bytes(b"not an image").is_err());
    }

    #[test]
    fn test_from_image_is_jpeg() {
        let decoded = image::load_from_memory(&png_bytes()).unwrap();
        let source = ImageSource::from_image(&decoded).unwrap();
        assert_eq!(source.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_from_data_url_validates_prefix() {
        assert!(ImageSource::from_data_url("data:image/png;base64,AAAA").is_some());
        assert!(ImageSource::from_data_url("https://example.com/a.png").is_none());
    }
}
