//! Resolve remote URLs and local paths into decoded images.
//!
//! Both sources go through [`decode_image_bytes`], so the same bytes always
//! decode to the same image regardless of where they came from.

use std::{io::Cursor, path::Path};

use image::{DynamicImage, ImageReader};

use crate::FeatureError;

/// Fetch an image over HTTP and decode it. One request, no retries.
pub fn load_image_url(url: &str) -> Result<DynamicImage, FeatureError> {
    log::debug!("Fetching image {}", url);
    let response = minreq::get(url)
        .send()
        .map_err(|err| FeatureError::load(url, err))?;
    if !(200..300).contains(&response.status_code) {
        return Err(FeatureError::load(
            url,
            format!(
                "HTTP status {} {}",
                response.status_code, response.reason_phrase
            ),
        ));
    }
    decode_image_bytes(response.as_bytes()).map_err(|err| FeatureError::load(url, err))
}

/// Read an image file and decode it
pub fn load_image_path<P: AsRef<Path>>(path: P) -> Result<DynamicImage, FeatureError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| FeatureError::load(path.display(), err))?;
    decode_image_bytes(&bytes).map_err(|err| FeatureError::load(path.display(), err))
}

/// Decode an in-memory image, guessing the format from its content
pub fn decode_image_bytes(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_a_load_error() {
        let err = load_image_path("does/not/exist.png").unwrap_err();
        assert!(matches!(err, FeatureError::Load { ref location, .. } if location.contains("exist.png")));
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(decode_image_bytes(b"definitely not an image").is_err());
    }

    #[test]
    fn decodes_png_bytes() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            3,
            2,
            image::Rgb([10, 20, 30]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_image_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.to_rgb8().get_pixel(1, 1).0, [10, 20, 30]);
    }
}
